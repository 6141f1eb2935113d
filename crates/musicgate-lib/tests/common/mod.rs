//! Canned upstream payloads shared by the adapter tests.

use serde_json::{json, Value};

pub const HOME_PAGE: &str = r#"<!DOCTYPE html><html><head><script>ytcfg.set({"INNERTUBE_API_KEY":"test-key","INNERTUBE_CLIENT_VERSION":"1.20240101.01.00","VISITOR_DATA":"visitor-1"});</script></head><body></body></html>"#;

fn run(text: &str, browse_id: Option<&str>) -> Value {
    match browse_id {
        Some(id) => json!({
            "text": text,
            "navigationEndpoint": {"browseEndpoint": {"browseId": id}}
        }),
        None => json!({"text": text}),
    }
}

pub fn song_item(video_id: &str, title: &str, artist: (&str, &str), album: Option<(&str, &str)>, duration: &str) -> Value {
    let mut details = vec![run(artist.0, Some(artist.1)), run(" • ", None)];
    if let Some((name, id)) = album {
        details.push(run(name, Some(id)));
        details.push(run(" • ", None));
    }
    details.push(run(duration, None));

    json!({
        "musicResponsiveListItemRenderer": {
            "thumbnail": {"musicThumbnailRenderer": {"thumbnail": {"thumbnails": [
                {"url": format!("https://img/{video_id}"), "width": 60, "height": 60}
            ]}}},
            "flexColumns": [
                {"musicResponsiveListItemFlexColumnRenderer": {"text": {"runs": [{"text": title}]}}},
                {"musicResponsiveListItemFlexColumnRenderer": {"text": {"runs": details}}}
            ],
            "playlistItemData": {"videoId": video_id}
        }
    })
}

pub fn search_response(items: Vec<Value>) -> Value {
    json!({
        "contents": {"tabbedSearchResultsRenderer": {"tabs": [{"tabRenderer": {"content": {"sectionListRenderer": {"contents": [
            {"itemSectionRenderer": {"contents": []}},
            {"musicShelfRenderer": {"contents": items}}
        ]}}}}]}}
    })
}
