//! Tests for chats command

use httpmock::prelude::*;
use serde_json::json;
use tempfile::tempdir;

use lark_dumper::commands::{export_chats, ChatsArgs, ExportSummary};
use lark_dumper::config::{Config, Credentials};
use lark_dumper::export::AttachmentFetcher;
use lark_dumper::LarkSession;

fn config(base_url: &str) -> Config {
    Config {
        app_id: "cli_test".into(),
        app_secret: "secret".into(),
        base_url: base_url.into(),
        chat_page_size: 20,
        message_page_size: 50,
    }
}

#[tokio::test]
async fn test_chats_exports_search_results_with_files() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST)
            .path("/open-apis/auth/v3/tenant_access_token/internal");
        then.status(200).json_body(json!({
            "code": 0,
            "tenant_access_token": "t-chats",
            "expire": 7200
        }));
    });
    let search = server.mock(|when, then| {
        when.method(GET)
            .path("/open-apis/im/v1/chats/search")
            .query_param("query", "Design")
            .query_param("page_size", "20");
        then.status(200).json_body(json!({
            "code": 0,
            "data": {
                "items": [{ "chat_id": "oc_design0000ab", "name": "Design Review" }],
                "has_more": false
            }
        }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/open-apis/im/v1/chats/oc_design0000ab");
        then.status(200)
            .json_body(json!({ "code": 0, "data": { "name": "Design Review" } }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/open-apis/im/v1/messages")
            .query_param("container_id", "oc_design0000ab")
            .query_param("page_size", "50");
        then.status(200).json_body(json!({
            "code": 0,
            "data": {
                "items": [{
                    "message_id": "om_mockups",
                    "msg_type": "file",
                    "deleted": false,
                    "body": { "content": "{\"file_key\":\"file_v2_1\",\"file_name\":\"mockups.fig\"}" }
                }],
                "has_more": false
            }
        }));
    });
    let download = server.mock(|when, then| {
        when.method(GET)
            .path("/open-apis/im/v1/messages/om_mockups/resources/file_v2_1")
            .query_param("type", "file");
        then.status(200).body("figma");
    });

    let session = LarkSession::new(
        Credentials {
            app_id: "cli_test".into(),
            app_secret: "secret".into(),
        },
        &server.base_url(),
    )
    .unwrap();
    let dir = tempdir().unwrap();
    let args = ChatsArgs {
        query: Some("Design".into()),
        all: false,
        path: dir.path().to_path_buf(),
        with_file: true,
    };

    let summary = export_chats(
        &session,
        &AttachmentFetcher::new().unwrap(),
        &config(&server.base_url()),
        &args,
    )
    .await
    .unwrap();

    assert_eq!(
        summary,
        ExportSummary {
            exported: 1,
            failed: 0
        }
    );
    assert!(dir.path().join("0000ab-Design Review.json").exists());
    assert_eq!(
        std::fs::read(dir.path().join("0000ab-Design Review").join("mockups.fig")).unwrap(),
        b"figma"
    );
    search.assert_calls(1);
    download.assert_calls(1);
}
