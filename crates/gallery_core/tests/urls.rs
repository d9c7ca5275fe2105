use gallery_core::{code_url, derive_target_url, display_label, ForgeHosts, UNKNOWN_LABEL};

#[test]
fn repo_url_is_rewritten_to_pages_url() {
    assert_eq!(
        derive_target_url("https://github.com/alice/proj"),
        "https://alice.github.io/proj"
    );
    // Anything past the repository segment is dropped.
    assert_eq!(
        derive_target_url("https://github.com/alice/proj/tree/main/src"),
        "https://alice.github.io/proj"
    );
}

#[test]
fn pages_and_foreign_urls_pass_through() {
    assert_eq!(
        derive_target_url("https://alice.github.io/proj"),
        "https://alice.github.io/proj"
    );
    assert_eq!(
        derive_target_url("https://example.com/demo"),
        "https://example.com/demo"
    );
    assert_eq!(derive_target_url(""), "");
}

#[test]
fn repo_url_without_repository_segment_is_unchanged() {
    assert_eq!(
        derive_target_url("https://github.com/alice"),
        "https://github.com/alice"
    );
    assert_eq!(
        derive_target_url("http://github.com/alice/proj"),
        "http://github.com/alice/proj"
    );
}

#[test]
fn derivation_is_stable_under_repetition() {
    let once = derive_target_url("https://github.com/bob/site");
    assert_eq!(derive_target_url(&once), once);
}

#[test]
fn label_comes_from_pages_subdomain() {
    assert_eq!(display_label("https://Alice.github.io/proj"), "alice");
    assert_eq!(display_label("https://bob.github.io/"), "bob");
}

#[test]
fn label_comes_from_repo_owner() {
    assert_eq!(display_label("https://github.com/carol/thing"), "carol");
    assert_eq!(display_label("https://github.com//dave/x"), "dave");
}

#[test]
fn label_falls_back_to_unknown() {
    assert_eq!(display_label(""), UNKNOWN_LABEL);
    assert_eq!(display_label("https://example.com/erin"), UNKNOWN_LABEL);
    assert_eq!(display_label("https://github.com/"), UNKNOWN_LABEL);
    assert_eq!(display_label("https://github.io.example.com/x"), UNKNOWN_LABEL);
}

#[test]
fn code_url_reconstructs_repository() {
    assert_eq!(
        code_url("https://alice.github.io/proj/index.html"),
        "https://github.com/alice/proj"
    );
    assert_eq!(
        code_url("https://github.com/alice/proj"),
        "https://github.com/alice/proj"
    );
    assert_eq!(
        code_url("https://alice.github.io/"),
        "https://alice.github.io/"
    );
    assert_eq!(code_url("https://example.com/x"), "https://example.com/x");
}

#[test]
fn custom_forge_hosts_are_respected() {
    let forge = ForgeHosts {
        repo_host: "gitlab.com".to_string(),
        pages_host: "gitlab.io".to_string(),
    };
    assert_eq!(
        forge.derive_target_url("https://gitlab.com/frank/app"),
        "https://frank.gitlab.io/app"
    );
    assert_eq!(forge.display_label("https://frank.gitlab.io/app"), "frank");
    assert_eq!(
        forge.derive_target_url("https://github.com/frank/app"),
        "https://github.com/frank/app"
    );
}
