use futures_util::StreamExt;
use serde_json::{json, Value};
use slide_quiz::core::DeltaStream;
use slide_quiz::json_utils::{extract_candidates, parse_batch_response};
use slide_quiz::{AIError, ExtractMode, IncrementalExtractor};

const PARTIAL: &str = r#"{"question":"Q1","answer":0}
{"question":"Q2""#;

fn questions(values: &[Value]) -> Vec<&str> {
    values.iter().filter_map(|v| v["question"].as_str()).collect()
}

fn deltas(parts: Vec<&str>) -> DeltaStream {
    let items: Vec<Result<String, AIError>> = parts.into_iter().map(|p| Ok(p.to_string())).collect();
    Box::pin(futures_util::stream::iter(items))
}

#[test]
fn ndjson_reassembles_across_every_split_point() {
    for mode in [ExtractMode::NewlineDelimited, ExtractMode::BraceScan] {
        for i in 0..=PARTIAL.len() {
            for j in i..=PARTIAL.len() {
                let mut ex = IncrementalExtractor::new(mode);
                let mut during = Vec::new();
                during.extend(ex.push(&PARTIAL[..i]));
                during.extend(ex.push(&PARTIAL[i..j]));
                during.extend(ex.push(&PARTIAL[j..]));
                assert_eq!(questions(&during), vec!["Q1"], "mode {mode:?} split at {i}/{j}");

                // Never closed: dropped at flush.
                assert!(ex.finish().is_empty(), "mode {mode:?} split at {i}/{j}");
            }
        }
    }
}

#[test]
fn closed_tail_arrives_only_at_flush() {
    let mut ex = IncrementalExtractor::new(ExtractMode::NewlineDelimited);
    assert_eq!(questions(&ex.push(PARTIAL)), vec!["Q1"]);
    assert!(ex.push("}").is_empty());
    assert_eq!(questions(&ex.finish()), vec!["Q2"]);
}

#[test]
fn brace_scan_survives_nested_braces_and_fences() {
    let text = "Sure! Here you go:\n```json\n{\"question\":\"What is {x}?\",\"answer\":1,\"choices\":[{\"t\":\"a\"},\"b\"],\"explanation\":\"set {1,2}\"}\n```\n{\"question\":\"Q\\\"2\",\"answer\":\"x\"}";
    let mut ex = IncrementalExtractor::new(ExtractMode::BraceScan);
    let mut got = Vec::new();
    for chunk in text.as_bytes().chunks(5) {
        got.extend(ex.push(std::str::from_utf8(chunk).unwrap()));
    }
    got.extend(ex.finish());
    assert_eq!(questions(&got), vec!["What is {x}?", "Q\"2"]);
    assert_eq!(got[0]["choices"][0], json!({"t": "a"}));
}

#[test]
fn brace_scan_recovers_after_stray_brace_in_prose() {
    let text = "Here are your questions in {question, answer form:\n{\"question\":\"A\",\"answer\":0}\n{\"question\":\"B\",\"answer\":1}\n";

    let mut whole = IncrementalExtractor::new(ExtractMode::BraceScan);
    let mut got = whole.push(text);
    got.extend(whole.finish());
    assert_eq!(questions(&got), vec!["A", "B"]);

    for size in [1, 3, 7] {
        let mut ex = IncrementalExtractor::new(ExtractMode::BraceScan);
        let mut got = Vec::new();
        for chunk in text.as_bytes().chunks(size) {
            got.extend(ex.push(std::str::from_utf8(chunk).unwrap()));
        }
        got.extend(ex.finish());
        assert_eq!(questions(&got), vec!["A", "B"], "chunk size {size}");
    }
}

#[test]
fn brace_scan_yields_objects_inside_top_level_array() {
    let mut ex = IncrementalExtractor::new(ExtractMode::BraceScan);
    let mut got = ex.push(r#"[{"question":"A"},"#);
    assert_eq!(questions(&got), vec!["A"]);
    got = ex.push(r#" {"question":"B"}]"#);
    assert_eq!(questions(&got), vec!["B"]);
    assert!(ex.finish().is_empty());
}

#[test]
fn malformed_lines_are_skipped_not_retried() {
    let mut ex = IncrementalExtractor::new(ExtractMode::NewlineDelimited);
    let got = ex.push("not json\n{\"question\":\"ok\"}\n{broken\n\n");
    assert_eq!(questions(&got), vec!["ok"]);
    assert_eq!(ex.pending(), "");
}

#[tokio::test]
async fn stream_flushes_once_at_end() {
    let items: Vec<_> = extract_candidates(
        deltas(vec!["{\"question\":\"a\"}\n{\"quest", "ion\":\"b\"}"]),
        ExtractMode::NewlineDelimited,
    )
    .collect()
    .await;
    let values: Vec<Value> = items.into_iter().map(Result::unwrap).collect();
    assert_eq!(questions(&values), vec!["a", "b"]);
}

#[tokio::test]
async fn provider_error_ends_without_flush() {
    let parts: Vec<Result<String, AIError>> = vec![
        Ok("{\"question\":\"a\"}\n{\"question\":\"b\"}".into()),
        Err(AIError::Stream("reset".into())),
        Ok("\n".into()),
    ];
    let items: Vec<_> = extract_candidates(Box::pin(futures_util::stream::iter(parts)), ExtractMode::NewlineDelimited)
        .collect()
        .await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap()["question"], "a");
    assert!(items[1].is_err());
}

#[test]
fn batch_response_shapes() {
    let doc = r#"{"items":[{"question":"a"},{"question":"b"}]}"#;
    assert_eq!(questions(&parse_batch_response(doc)), vec!["a", "b"]);

    let ndjson = "{\"question\":\"a\"}\n{\"question\":\"b\"}\n";
    assert_eq!(questions(&parse_batch_response(ndjson)), vec!["a", "b"]);

    let fenced = "```json\n[{\"question\":\"a\"}]\n```";
    assert_eq!(questions(&parse_batch_response(fenced)), vec!["a"]);

    let prose = "Here: {\"question\":\"a\"} and {\"question\":\"b\"}.";
    assert_eq!(questions(&parse_batch_response(prose)), vec!["a", "b"]);

    assert!(parse_batch_response("no json at all").is_empty());
}
