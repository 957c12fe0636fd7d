use reverb_core::{CollectedItem, MediaRefs, Platform};

#[test]
fn test_minimal_item_json_fills_defaults() {
    let raw = r#"[{"id": "1", "url": "https://x.com/a/status/1", "text": "hello"}]"#;
    let items: Vec<CollectedItem> = serde_json::from_str(raw).unwrap();

    let item = &items[0];
    assert_eq!(*item.platform(), Platform::X);
    assert_eq!(*item.media(), MediaRefs::None);
    assert_eq!(item.metrics().likes, 0);
    assert!(item.author().is_none());
}

#[test]
fn test_media_is_tagged_by_kind() {
    let item = CollectedItem::builder()
        .id("2")
        .url("https://www.reddit.com/r/rust/comments/2")
        .platform(Platform::Reddit)
        .media(MediaRefs::Images(vec!["a.jpg".into(), "b.jpg".into()]))
        .build()
        .unwrap();

    let value = serde_json::to_value(&item).unwrap();
    assert_eq!(value["platform"], "reddit");
    assert_eq!(value["media"]["kind"], "images");
    assert_eq!(value["media"]["urls"][1], "b.jpg");

    let back: CollectedItem = serde_json::from_value(value).unwrap();
    assert_eq!(back.media().to_legacy_string(), "a.jpg;b.jpg");
}
