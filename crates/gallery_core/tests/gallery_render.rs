use gallery_core::{
    render_gallery, CaptureResult, CardStatus, ForgeHosts, GalleryView, RunState, WorkItem,
    FAILED_MARKER, PENDING_MARKER,
};
use pretty_assertions::assert_eq;

fn items() -> Vec<WorkItem> {
    vec![
        WorkItem {
            id: "101".into(),
            source_url: "https://github.com/alice/proj".into(),
            target_url: "https://alice.github.io/proj".into(),
            display_label: "alice".into(),
        },
        WorkItem {
            id: "102".into(),
            source_url: "https://bob.github.io/site".into(),
            target_url: "https://bob.github.io/site".into(),
            display_label: "bob".into(),
        },
        WorkItem {
            id: "103".into(),
            source_url: "https://example.com/<x>".into(),
            target_url: "https://example.com/<x>".into(),
            display_label: "Unknown".into(),
        },
    ]
}

#[test]
fn empty_state_renders_placeholders_for_every_item() {
    let items = items();
    let state = RunState::new(&items);
    let view = GalleryView::build(&state, &items, &ForgeHosts::github());
    assert!(view.cards.iter().all(|c| c.status == CardStatus::Pending));

    let html = render_gallery(&view, "now");
    assert_eq!(html.matches(PENDING_MARKER).count(), 3);
    assert!(html.contains("0 of 3 captured (0 failed)"));
    assert!(!html.contains("<img"));
}

#[test]
fn completed_items_render_results_and_diagnostics() {
    let items = items();
    let mut state = RunState::new(&items);
    state
        .record(CaptureResult::success(
            "101",
            "screenshots/demo_101.png",
            vec!["[log] ready".into()],
        ))
        .unwrap();
    state
        .record(CaptureResult::failure(
            "103",
            None,
            vec!["Screenshot error: navigation timed out".into()],
        ))
        .unwrap();

    let view = GalleryView::build(&state, &items, &ForgeHosts::github());
    assert_eq!(view.completed, 2);
    assert_eq!(view.failed, 1);
    let html = render_gallery(&view, "now");

    assert!(html.contains("<img src=\"screenshots/demo_101.png\""));
    assert!(html.contains("Console Messages (1)"));
    assert_eq!(html.matches(PENDING_MARKER).count(), 1);
    assert!(html.contains(FAILED_MARKER));
    assert!(html.contains("<div class=\"card failed\" id=\"item-103\">"));
    assert!(html.contains("https://github.com/bob/site"));
    assert!(html.contains("https://example.com/&lt;x&gt;"));
    assert!(!html.contains("<x>"));
}

#[test]
fn placeholder_image_is_shown_for_failed_capture() {
    let items = items();
    let mut state = RunState::new(&items);
    state
        .record(CaptureResult::failure(
            "102",
            Some("screenshots/demo_102.png".into()),
            vec![],
        ))
        .unwrap();
    let view = GalleryView::build(&state, &items, &ForgeHosts::github());
    assert_eq!(
        view.cards[1].status,
        CardStatus::Failed {
            artifact_path: Some("screenshots/demo_102.png".into())
        }
    );
    let html = render_gallery(&view, "now");
    assert!(html.contains("<img src=\"screenshots/demo_102.png\""));
}

#[test]
fn rendering_is_idempotent_for_identical_input() {
    let items = items();
    let mut state = RunState::new(&items);
    state
        .record(CaptureResult::success("102", "screenshots/demo_102.png", vec![]))
        .unwrap();

    let first = render_gallery(&GalleryView::build(&state, &items, &ForgeHosts::github()), "t");
    let second = render_gallery(
        &GalleryView::build(&state.clone(), &items, &ForgeHosts::github()),
        "t",
    );
    assert_eq!(first, second);

    let later = render_gallery(&GalleryView::build(&state, &items, &ForgeHosts::github()), "t2");
    assert_ne!(first, later);
    assert_eq!(first.replace("Last updated: t<", ""), later.replace("Last updated: t2<", ""));
}
