//! Property tests for line grouping, script detection and entity handling.

use proptest::prelude::*;

use svgbook::RunContext;
use svgbook::entities::decode_cosmetic_entities;
use svgbook::footnote::FootnoteDelimiters;
use svgbook::layout::extract_lines;
use svgbook::svg::parse_fragment;

fn fragment(glyphs: &[String]) -> String {
    format!("<svg>{}</svg>", glyphs.concat())
}

proptest! {
    #[test]
    fn prop_lines_group_by_exact_y(ys in prop::collection::vec(0u32..6, 1..40)) {
        let glyphs: Vec<String> = ys
            .iter()
            .enumerate()
            .map(|(i, y)| format!(r#"<text x="{i}" y="{}">g{i}</text>"#, y * 10))
            .collect();
        let root = parse_fragment("c", &fragment(&glyphs)).unwrap();
        let lines = extract_lines("c", &root, &RunContext::default());

        let mut distinct: Vec<u32> = ys.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(lines.len(), distinct.len());

        for (line, y) in lines.iter().zip(&distinct) {
            prop_assert_eq!(line.key, f64::from(y * 10));
            let expected: Vec<String> = ys
                .iter()
                .enumerate()
                .filter(|(_, v)| *v == y)
                .map(|(i, _)| format!("g{i}"))
                .collect();
            let actual: Vec<String> = line.glyphs.iter().map(|g| g.content.clone()).collect();
            prop_assert_eq!(actual, expected);
        }
    }

    #[test]
    fn prop_short_numbers_below_ratio_are_scripts(
        digits in "[0-9]{1,3}",
        top in 40u32..120,
    ) {
        // 0.79 of the baseline height
        let svg = format!(
            r#"<svg><text x="0" y="100" top="80" height="20" len="10">Body text</text><text x="50" y="100" top="{top}" height="15.8">{digits}</text></svg>"#
        );
        let root = parse_fragment("c", &svg).unwrap();
        let lines = extract_lines("c", &root, &RunContext::default());
        prop_assert_eq!(lines.len(), 1);
        let glyph = &lines[0].glyphs[1];
        prop_assert_eq!(glyph.is_footnote_ref, f64::from(top) < 80.0);
        prop_assert_eq!(glyph.is_sub, f64::from(top) >= 80.0);
    }

    #[test]
    fn prop_long_words_above_ratio_are_not_scripts(word in "[a-z]{6,12}", top in 40u32..120) {
        // 0.85 of the baseline height
        let svg = format!(
            r#"<svg><text x="0" y="100" top="80" height="20" len="10">Body text</text><text x="50" y="100" top="{top}" height="17">{word}</text></svg>"#
        );
        let root = parse_fragment("c", &svg).unwrap();
        let lines = extract_lines("c", &root, &RunContext::default());
        let glyph = &lines[0].glyphs[1];
        prop_assert!(!glyph.is_footnote_ref);
        prop_assert!(!glyph.is_sub);
    }

    #[test]
    fn prop_escaped_tags_survive_decoding(
        tag in "[a-z]{1,8}",
        text in "[a-zA-Z ]{0,20}",
    ) {
        let input = format!("{text}&nbsp;&lt;{tag}&gt;{text}&amp;&lt;/{tag}&gt;&lt;{tag}/&gt;");
        let expected = format!("{text} &lt;{tag}&gt;{text}&&lt;/{tag}&gt;&lt;{tag}/&gt;");
        prop_assert_eq!(decode_cosmetic_entities(&input), expected);
    }

    #[test]
    fn prop_translation_swaps_markers(n in 1u32..500) {
        let delimiters = FootnoteDelimiters::new("note-fwd-", "note-back-");
        let forward = format!("note-fwd-{n}");
        let back = delimiters.translate(&forward);
        prop_assert_eq!(&back, &format!("note-back-{n}"));
        prop_assert_eq!(delimiters.translate(&back), forward);
    }

    #[test]
    fn prop_single_marker_is_noop(fragment in "[a-z-]{1,12}[0-9]{1,3}") {
        let delimiters = FootnoteDelimiters::new("note-fwd-", "");
        prop_assert_eq!(delimiters.translate(&fragment), fragment.clone());
    }
}
