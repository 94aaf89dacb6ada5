use super::assembler::ToolCallAssembler;
use super::detector::{substitute_spans, InlineCallDetector};
use crate::llm::ToolCallFragment;
use proptest::prelude::*;

fn split_points(len: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..=len, 0..6).prop_map(move |mut points| {
        points.sort_unstable();
        points.dedup();
        points
    })
}

/// Feed `text` to a detector in chunks cut at `points` (byte offsets are
/// snapped down to char boundaries) and collect every detection.
fn scan_in_chunks(text: &str, points: &[usize]) -> Vec<super::InlineCall> {
    let mut detector = InlineCallDetector::new();
    let mut buffer = String::new();
    let mut found = Vec::new();
    let mut prev = 0;
    for &raw in points {
        let mut cut = raw.min(text.len());
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut <= prev {
            continue;
        }
        buffer.push_str(&text[prev..cut]);
        found.extend(detector.scan(&buffer));
        prev = cut;
    }
    buffer.push_str(&text[prev..]);
    found.extend(detector.scan(&buffer));
    found
}

proptest! {
    /// However a single occurrence is split across deltas, it is detected
    /// exactly once with the exact byte span of the placeholder.
    #[test]
    fn prop_split_never_changes_detection(
        prefix in "[a-z ,。]{0,20}",
        name in "[A-Za-z][A-Za-z0-9_]{0,12}",
        argument in "[A-Za-z0-9 ,]{0,20}",
        suffix in "[a-z ,。]{0,20}",
        points in split_points(80),
    ) {
        let placeholder = format!("[FunctionCall:{name}({argument})]");
        let text = format!("{prefix}{placeholder}{suffix}");

        let calls = scan_in_chunks(&text, &points);
        prop_assert_eq!(calls.len(), 1);
        prop_assert_eq!(&calls[0].name, &name);
        prop_assert_eq!(&calls[0].argument, &argument);
        prop_assert_eq!(&text[calls[0].span.clone()], placeholder.as_str());
    }

    /// Substituting the detected spans yields the same text as if the
    /// placeholders had never been there.
    #[test]
    fn prop_substitution_matches_spans(
        prefix in "[a-z ]{0,12}",
        middle in "[a-z ]{0,12}",
        result_a in "[A-Za-z0-9 ]{0,16}",
        result_b in "[A-Za-z0-9 ]{0,16}",
    ) {
        let text = format!(
            "{prefix}[FunctionCall:getWeather(Beijing)]{middle}[FunctionCall:getFood(Beijing)]"
        );
        let mut detector = InlineCallDetector::new();
        let calls = detector.scan(&text);
        prop_assert_eq!(calls.len(), 2);

        let out = substitute_spans(
            &text,
            &[
                (calls[0].span.clone(), result_a.as_str()),
                (calls[1].span.clone(), result_b.as_str()),
            ],
        );
        prop_assert_eq!(out, format!("{prefix}{result_a}{middle}{result_b}"));
    }

    /// Fragment arrival order within an index never changes the assembled
    /// arguments, and distinct indices assemble independently.
    #[test]
    fn prop_assembly_independent_of_chunking(
        arguments in "\\{\"location\":\"[A-Za-z]{1,12}\"\\}",
        cut in 0usize..24,
    ) {
        let cut = cut.min(arguments.len());
        let (head, tail) = arguments.split_at(cut);

        let mut whole = ToolCallAssembler::new();
        whole.apply(&ToolCallFragment {
            index: 0,
            id: Some("call-1".to_string()),
            name: Some("getWeather".to_string()),
            arguments: Some(arguments.clone()),
        });

        let mut chunked = ToolCallAssembler::new();
        chunked.apply(&ToolCallFragment {
            index: 0,
            id: Some("call-1".to_string()),
            name: Some("getWeather".to_string()),
            arguments: None,
        });
        chunked.apply(&ToolCallFragment {
            index: 0,
            id: None,
            name: None,
            arguments: Some(head.to_string()),
        });
        chunked.apply(&ToolCallFragment {
            index: 0,
            id: None,
            name: None,
            arguments: Some(tail.to_string()),
        });

        prop_assert_eq!(whole.finish(), chunked.finish());
    }
}
