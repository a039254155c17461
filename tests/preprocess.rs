use markvars::VarContext;

fn setup() -> VarContext {
    let mut context = VarContext::new();
    context.set_page(0);
    context.clear_queue();
    context
}

fn render(source: &str) -> String {
    setup().preprocess(source)
}

fn render_all(context: &mut VarContext, pages: &[&str]) -> Vec<String> {
    pages
        .iter()
        .enumerate()
        .map(|(index, page)| {
            context.set_page(index);
            context.preprocess(page)
        })
        .collect()
}

fn rerender_all(context: &mut VarContext, pages: &[&str]) -> Vec<String> {
    render_all(context, pages);
    context.set_page(0);
    context.clear_queue();
    render_all(context, pages)
}

mod block_variables {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_text() {
        assert_eq!(render("[var]: string\n\n$[var]\n"), "\n\nstring\n");
    }

    #[test]
    fn test_multiline_string() {
        assert_eq!(
            render("[var]: string\nacross multiple\nlines\n\n$[var]"),
            "\n\nstring\nacross multiple\nlines"
        );
    }

    #[test]
    fn test_table_body() {
        let source = "[var]:\n##### Title\n| H1 | H2 | \n|:---|:--:|\n| A  | B  |\n| C  | D  |\n\n$[var]";
        assert_eq!(
            render(source),
            "\n\n##### Title\n| H1 | H2 | \n|:---|:--:|\n| A | B |\n| C | D |"
        );
    }

    #[test]
    fn test_hoists_within_page() {
        assert_eq!(render("$[var]\n\n[var]: string"), "string\n\n");
    }

    #[test]
    fn test_hoists_last_instance() {
        assert_eq!(
            render("$[var]\n\n[var]: string\n\n[var]: new string"),
            "new string\n\n\n\n"
        );
    }

    #[test]
    fn test_complex_hoisting() {
        let source = "$[titleAndName]: $[title] $[fullName]\n\n\
                      $[title]: Mr.\n\n\
                      $[fullName]: $[firstName] $[lastName]\n\n\
                      [firstName]: Bob\n\n\
                      Welcome, $[titleAndName]!\n\n\
                      [lastName]: Jacob\n\n\
                      [lastName]: $[lastName]son\n";
        assert_eq!(
            render(source).trim(),
            "Welcome, Mr. Bob Jacobson!"
        );
    }

    #[test]
    fn test_reassignment_with_hoisting() {
        assert_eq!(
            render("$[var]\n\n[var]: one\n\n$[var]\n\n[var]: two\n\n$[var]"),
            "two\n\n\n\none\n\n\n\ntwo"
        );
    }

    #[test]
    fn test_unhoistable_references_stay_literal() {
        assert_eq!(
            render("$[var](My name is $[first] $[last])\n\n$[last]: Jones\n"),
            "My name is $[first] Jones\n\n\n"
        );
    }
}

mod inline_variables {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_text() {
        assert_eq!(render("$[var](string)\n\n$[var]\n"), "string\n\nstring\n");
    }

    #[test]
    fn test_hoists_when_possible() {
        assert_eq!(
            render("$[var](My name is $[name] Jones)\n\n[name]: Bob"),
            "My name is Bob Jones\n\n"
        );
    }

    #[test]
    fn test_hoists_last_instance() {
        assert_eq!(
            render("$[var](My name is $[name] Jones)\n\n$[name](Bob)\n\n[name]: Bill"),
            "My name is Bill Jones\n\nBob\n\n"
        );
    }

    #[test]
    fn test_only_balanced_parens_are_captured() {
        let source = "$[var1](A variable (with nested parens) inside)\n\n$[var1]\n\n\
                      $[var2](A variable ) with unbalanced parens)\n\n$[var2]";
        assert_eq!(
            render(source),
            "A variable (with nested parens) inside\n\n\
             A variable (with nested parens) inside\n\n\
             A variable with unbalanced parens)\n\n\
             A variable"
        );
    }
}

mod math {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_numbers_only() {
        assert_eq!(render("$[1 + 3 * 5 - (1 / 4)]\n"), "15.75\n");
    }

    #[test]
    fn test_rounding_functions() {
        assert_eq!(render("$[round(1/4)]"), "0");
        assert_eq!(render("$[floor(0.6)]"), "0");
        assert_eq!(render("$[ceil(0.2)]"), "1");
        assert_eq!(render("$[ceil(floor(round(0.6)))]"), "1");
    }

    #[test]
    fn test_with_variables() {
        let source = "$[num1]: 5\n\n$[num2]: 4\n\nAnswer is $[answer]($[1 + 3 * num1 - (1 / num2)]).\n";
        assert_eq!(render(source).trim(), "Answer is 15.75.");
    }

    #[test]
    fn test_incrementing() {
        let source = "$[num1]: 5\n\nIncrement num1 to get $[num1]($[num1 + 1]) and again to $[num1]($[num1 + 1]).\n";
        assert_eq!(render(source).trim(), "Increment num1 to get 6 and again to 7.");
    }

    #[test]
    fn test_variables_as_function_parameters() {
        assert_eq!(render("[var]:4.1\n\n$[floor(var)]"), "\n\n4");
        assert_eq!(render("[var1]:4\n\n[var2]:8\n\n$[var1 * var2]"), "\n\n\n\n32");
    }

    #[test]
    fn test_disabled_functions_stay_literal() {
        assert_eq!(render("[var]:4\n\n$[min(1,var)]"), "\n\n$[min(1,var)]");
        assert_eq!(render("$[sin(1)]"), "$[sin(1)]");
    }
}

mod name_collisions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_function_names() {
        assert_eq!(render("[a]: -1\n\n$[abs(a)]"), "\n\n1");
    }

    #[test]
    fn test_other_variable_names() {
        assert_eq!(render("[ab]: 2\n\n[aba]: 8\n\n[ba]: 4\n\n$[ab + aba + ba]"), "\n\n\n\n\n\n14");
    }
}

mod custom_functions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sign() {
        assert_eq!(
            render("[a]: 13\n\n[b]: -11\n\nPositive: $[sign(a)]\n\nNegative: $[sign(b)]"),
            "\n\n\n\nPositive: +\n\nNegative: -"
        );
    }

    #[test]
    fn test_signed() {
        assert_eq!(
            render("[a]: 13\n\n[b]: -11\n\nPositive: $[signed(a)]\n\nNegative: $[signed(b)]"),
            "\n\n\n\nPositive: +13\n\nNegative: -11"
        );
    }

    #[test]
    fn test_roman_numerals() {
        assert_eq!(render("[a]: 18\n\nRoman Numeral: $[toRomans(a)]"), "\n\nRoman Numeral: xviii");
        assert_eq!(render("[a]: 18\n\nRoman Numeral: $[toRomansUpper(a)]"), "\n\nRoman Numeral: XVIII");
        assert_eq!(render("[a]: 18\n\nRoman Numeral: $[toRomansLower(a)]"), "\n\nRoman Numeral: xviii");
    }

    #[test]
    fn test_characters() {
        let source = "[a]: 18\n\n[b]: 39\n\nCharacters: $[toChar(a)] $[toChar(b)]";
        assert_eq!(render(source), "\n\n\n\nCharacters: R AM");
        let source = "[a]: 18\n\n[b]: 39\n\nCharacters: $[toCharLower(a)] $[toCharLower(b)]";
        assert_eq!(render(source), "\n\n\n\nCharacters: r am");
    }

    #[test]
    fn test_words() {
        assert_eq!(
            render("[a]: 80085\n\nWords: $[toWords(a)]"),
            "\n\nWords: eighty thousand and eighty-five"
        );
        assert_eq!(
            render("[a]: 80085\n\nWords: $[toWordsUpper(a)]"),
            "\n\nWords: EIGHTY THOUSAND AND EIGHTY-FIVE"
        );
        assert_eq!(
            render("[a]: 80085\n\nWords: $[toWordsCaps(a)]"),
            "\n\nWords: Eighty Thousand And Eighty-Five"
        );
    }
}

mod code_blocks {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fenced() {
        let source = "```\n[var]: string\n\n$[var]\n\n$[var](new string)\n```";
        assert_eq!(render(source), source);
    }

    #[test]
    fn test_indented() {
        let source = "test\n\n    [var]: string\n\n    $[var]\n\n    $[var](new string)";
        assert_eq!(render(source), source);
    }

    #[test]
    fn test_inline() {
        let source = "[var](Hello) `[link](url)`. This `[var] does not work`";
        assert_eq!(render(source), source);
    }

    #[test]
    fn test_closing_fence_must_be_as_long() {
        let source = "[a]: 1\n\n````\n$[a]\n```\n$[a]\n````\n$[a]";
        assert_eq!(render(source), "\n\n````\n$[a]\n```\n$[a]\n````\n1");
    }

    #[test]
    fn test_unclosed_backtick_does_not_hide_variables() {
        assert_eq!(render("[x]: 5\n\nPrice ` $[x]"), "\n\nPrice ` 5");
    }
}

mod links_and_images {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normal_markdown_survives() {
        for source in [
            "![alt text](url)",
            "An image ![alt text](url \"and title\")!",
            "![alt text](url){width:100px}",
            "A Link to my [website](url)!",
            "A Link to my [website](url \"and title\")!",
            "\n|  title 1  | title 2 | title 3 | title 4|\n|-----------|---------|---------|--------|\n|[foo](bar) |  Ipsum  |    )    |   )    |\n",
        ] {
            assert_eq!(render(source), source);
        }
    }

    #[test]
    fn test_alt_text_spacing_is_normalized() {
        assert_eq!(
            render("![ where is my image??](http://i.imgur.com/hMna6G0.png)"),
            "![where is my image??](http://i.imgur.com/hMna6G0.png)"
        );
        assert_eq!(
            render("![where  is my image??](http://i.imgur.com/hMna6G0.png)"),
            "![where is my image??](http://i.imgur.com/hMna6G0.png)"
        );
    }

    #[test]
    fn test_block_call_renders_link() {
        assert_eq!(
            render("[home]: <https://example.com> 'Home page'\n\n[home]"),
            "\n\n[home](<https://example.com> \"Home page\")"
        );
    }
}

mod cross_page {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_recall_on_later_page() {
        let mut context = setup();
        assert_eq!(
            render_all(&mut context, &["[var]: string", "$[var]"]),
            vec!["", "string"]
        );
    }

    #[test]
    fn test_hoisting_requires_a_prior_render() {
        let pages = ["$[var]", "[var]: string"];
        let mut context = setup();
        assert_eq!(render_all(&mut context, &pages), vec!["$[var]", ""]);

        context.set_page(0);
        context.clear_queue();
        assert_eq!(render_all(&mut context, &pages), vec!["string", ""]);
    }

    #[test]
    fn test_reassignment_and_hoisting() {
        let pages = ["$[var]\n\n[var]: one\n\n$[var]", "[var]: two\n\n$[var]"];
        let mut context = setup();
        assert_eq!(
            rerender_all(&mut context, &pages),
            vec!["two\n\n\n\none", "\n\ntwo"]
        );
    }

    #[test]
    fn test_backward_wins_over_hoisted() {
        let pages = ["[v]: zero", "$[v]", "[v]: two"];
        let mut context = setup();
        assert_eq!(rerender_all(&mut context, &pages), vec!["", "zero", ""]);
    }

    #[test]
    fn test_external_page_numbers() {
        let pages = ["$[pageNumber]\n\n", "$[pageNumber]\n\n"];
        let mut context = setup();
        context.set_variable("pageNumber", "1", 0);
        context.set_variable("pageNumber", "2", 1);
        assert_eq!(
            render_all(&mut context, &pages),
            vec!["1\n\n", "2\n\n"]
        );
    }

    #[test]
    fn test_custom_page_number_overrides() {
        let pages = ["[pageNumber]:100\n\n$[pageNumber]\n\n", "$[pageNumber]\n\n"];
        let mut context = setup();
        assert_eq!(
            rerender_all(&mut context, &pages),
            vec!["\n\n100\n\n", "100\n\n"]
        );
    }

    #[test]
    fn test_get_variable_sees_other_pages() {
        let mut context = setup();
        render_all(&mut context, &["[a]: first", "[b]: second"]);
        assert_eq!(context.get_variable("a", 1), Some("first"));
        assert_eq!(context.get_variable("b", 0), Some("second"));
        assert_eq!(context.get_variable("c", 0), None);
    }
}

mod properties {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolved_output_is_idempotent() {
        for source in [
            "[a]: 2\n\nTwice is $[a * 2], roman $[toRomansUpper(a)].",
            "[v]: hello\n\nSay $[v] to [website](http://example.com).",
        ] {
            let once = render(source);
            assert_eq!(render(&once), once);
        }
    }

    #[test]
    fn test_last_definition_wins() {
        assert_eq!(render("[x]: first\n\n[x]: second\n\n$[x]"), "\n\n\n\nsecond");
    }

    #[test]
    fn test_partial_definition_reaches_fixed_point() {
        assert_eq!(
            render("[site]: http://x\n\n[d]: [site] $[missing]\n\n$[d]"),
            "\n\n\n\n[site](http://x) $[missing]"
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        assert_eq!(
            render("[var]: string\r\nacross lines\r\n\r\n$[var]"),
            "\n\r\nstring\r\nacross lines"
        );
    }

    #[test]
    fn test_never_panics_on_malformed_input() {
        for source in ["[", "$[", "![]", "[a](", "[a]:", "```", "$[(]", "$[1 +]", "\\[a]", "[a\\"] {
            let _ = render(source);
        }
    }
}
