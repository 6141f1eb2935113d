use musicgate_lib::casing::{camel_case_keys, is_normalized};
use serde_json::json;

#[test]
fn rewrites_nested_objects_and_arrays() {
    let input = json!({
        "status": "Success",
        "data": {
            "top_results": [
                {"song_id": "a_1", "primary_artists": [{"artist_name": "snake_case_value"}]},
                {"song_id": "b_2", "primary_artists": []}
            ],
            "image_url": null
        }
    });

    let output = camel_case_keys(input);

    assert_eq!(
        output,
        json!({
            "status": "Success",
            "data": {
                "topResults": [
                    {"songId": "a_1", "primaryArtists": [{"artistName": "snake_case_value"}]},
                    {"songId": "b_2", "primaryArtists": []}
                ],
                "imageUrl": null
            }
        })
    );
    assert!(is_normalized(&output));
}

#[test]
fn string_values_are_untouched() {
    let output = camel_case_keys(json!({"message": "Query 'q' is required", "items": ["snake_case", "Pascal_Case"]}));
    assert_eq!(output["message"], "Query 'q' is required");
    assert_eq!(output["items"], json!(["snake_case", "Pascal_Case"]));
}

#[test]
fn transform_is_idempotent() {
    let samples = [
        json!({"video_id": 1, "VideoTitle": {"thumbnail_url": "x"}}),
        json!([{"release-date": "2024"}, {"playCount": 3}]),
        json!({"a": {"b_c": {"d_e_f": [1, {"g_h": true}]}}}),
        json!("plain_string"),
        json!(null),
    ];

    for sample in samples {
        let once = camel_case_keys(sample);
        let twice = camel_case_keys(once.clone());
        assert_eq!(once, twice);
    }
}
