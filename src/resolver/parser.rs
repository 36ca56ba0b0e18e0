// Output parser for the JSON records printed by `ykdl --json` / `you-get --json`
//
// Layout shared by both tools:
//   {"title": .., "site": .., "streams": {id: {"container", "src", "size"}},
//    "stream_types": [id, ..], "extra": {"referer", "ua", "danmaku", "seekable"}}
//
// Parsing never fails. Anything unusable ends up as an empty stream list,
// which the coordinator treats as a failed run.

use serde_json::{Map, Value};

use super::models::ResolutionResult;
use super::utils::file_stem;

/// How to pick a stream when no preference matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOrder {
    /// Follow the tool's `stream_types` list (best first)
    Declared,
    /// Pick the stream with the largest `size`
    LargestFirst,
}

pub fn parse(stdout: &[u8], order: StreamOrder, preferred: Option<&str>) -> ResolutionResult {
    let text = String::from_utf8_lossy(stdout);
    let Some(record) = first_json_object(&text) else {
        tracing::debug!("no JSON record in resolver output ({} bytes)", stdout.len());
        return ResolutionResult::default();
    };
    parse_record(&record, order, preferred)
}

/// Find the resolver record in `text`: the first JSON object carrying
/// `streams`, else the first JSON object at all. Log lines are skipped.
fn first_json_object(text: &str) -> Option<Value> {
    let mut fallback = None;
    let mut offset = 0;
    while let Some(pos) = text[offset..].find('{') {
        let start = offset + pos;
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(value)) = values.next() {
            if value.get("streams").is_some() {
                return Some(value);
            }
            if value.is_object() && fallback.is_none() {
                fallback = Some(value);
            }
        }
        offset = start + 1;
    }
    fallback
}

fn parse_record(record: &Value, order: StreamOrder, preferred: Option<&str>) -> ResolutionResult {
    let mut result = ResolutionResult {
        title: record["title"].as_str().unwrap_or_default().trim().to_string(),
        ..ResolutionResult::default()
    };

    let extra = &record["extra"];
    result.referer = non_empty_str(&extra["referer"]);
    result.user_agent = non_empty_str(&extra["ua"]);
    result.caption_url = non_empty_str(&extra["danmaku"]).or_else(|| non_empty_str(&record["danmaku"]));
    result.seekable = extra["seekable"].as_bool().unwrap_or(true);

    let Some(streams) = record["streams"].as_object() else {
        tracing::debug!("resolver record for '{}' has no streams", result.title);
        return result;
    };
    let Some((id, stream)) = select_stream(streams, record, order, preferred) else {
        tracing::debug!("resolver record for '{}' has no stream with sources", result.title);
        return result;
    };

    let (urls, adaptive) = stream_sources(&stream["src"]);
    result.container = stream["container"].as_str().unwrap_or_default().to_string();
    result.file_names = file_names(&result.title, &result.container, urls.len(), adaptive);
    result.stream_urls = urls;
    result.is_adaptive = adaptive;

    tracing::debug!(
        "selected stream '{}' ({} url(s), adaptive={}) for '{}'",
        id,
        result.stream_urls.len(),
        adaptive,
        result.title
    );
    result
}

fn select_stream<'a>(
    streams: &'a Map<String, Value>,
    record: &Value,
    order: StreamOrder,
    preferred: Option<&str>,
) -> Option<(&'a str, &'a Value)> {
    let usable = |stream: &Value| !stream_sources(&stream["src"]).0.is_empty();

    if let Some((id, stream)) = preferred.and_then(|p| streams.get_key_value(p)) {
        if usable(stream) {
            return Some((id.as_str(), stream));
        }
    }

    let ordered = match order {
        StreamOrder::Declared => record["stream_types"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .filter_map(|id| streams.get_key_value(id))
            .find(|(_, stream)| usable(stream)),
        StreamOrder::LargestFirst => streams
            .iter()
            .filter(|(_, stream)| usable(stream))
            .max_by(|a, b| {
                let size = |s: &Value| s["size"].as_u64().unwrap_or(0);
                size(a.1).cmp(&size(b.1)).then_with(|| b.0.cmp(a.0))
            }),
    };

    ordered
        .or_else(|| streams.iter().find(|(_, stream)| usable(stream)))
        .map(|(id, stream)| (id.as_str(), stream))
}

/// Stream URLs of a `src` value and whether it is a video/audio pair
fn stream_sources(src: &Value) -> (Vec<String>, bool) {
    match src {
        Value::String(url) if !url.is_empty() => (vec![url.clone()], false),
        Value::Array(items) if items.len() == 2 && items.iter().all(Value::is_array) => {
            fn first(v: &Value) -> Option<&str> {
                v.as_array().and_then(|a| a.first()).and_then(Value::as_str)
            }
            match (first(&items[0]), first(&items[1])) {
                (Some(video), Some(audio)) if !video.is_empty() && !audio.is_empty() => {
                    (vec![video.to_string(), audio.to_string()], true)
                }
                _ => (Vec::new(), false),
            }
        }
        Value::Array(items) => (
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            false,
        ),
        _ => (Vec::new(), false),
    }
}

fn file_names(title: &str, container: &str, count: usize, adaptive: bool) -> Vec<String> {
    let base = file_stem(title);
    let with_ext = |stem: String| {
        if container.is_empty() {
            stem
        } else {
            format!("{}.{}", stem, container)
        }
    };

    match count {
        0 => Vec::new(),
        1 => vec![with_ext(base)],
        _ if adaptive => vec![with_ext(base.clone()), with_ext(format!("{}_audio", base))],
        _ => (0..count).map(|i| with_ext(format!("{}_{}", base, i))).collect(),
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
