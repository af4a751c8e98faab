//! Tests for list chats command

use httpmock::prelude::*;
use serde_json::json;

use lark_dumper::commands::{discover, list_chats::format_chat};
use lark_dumper::config::Credentials;
use lark_dumper::LarkSession;

#[tokio::test]
async fn test_list_chats_prints_id_and_name() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST)
            .path("/open-apis/auth/v3/tenant_access_token/internal");
        then.status(200).json_body(json!({
            "code": 0,
            "tenant_access_token": "t-list",
            "expire": 7200
        }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/open-apis/im/v1/chats/search")
            .query_param("query", "eng")
            .query_param("user_id_type", "open_id");
        then.status(200).json_body(json!({
            "code": 0,
            "data": {
                "items": [
                    { "chat_id": "oc_eng", "name": "Engineering", "chat_status": "normal" },
                    { "chat_id": "oc_eng_ops", "name": "Eng/Ops" }
                ],
                "page_token": "",
                "has_more": false
            }
        }));
    });
    let session = LarkSession::new(
        Credentials {
            app_id: "cli_test".into(),
            app_secret: "secret".into(),
        },
        &server.base_url(),
    )
    .unwrap();

    let chats = discover(&session, Some("eng"), 20).await.unwrap();
    let lines: Vec<_> = chats.iter().map(format_chat).collect();
    assert_eq!(lines, vec!["oc_eng\tEngineering", "oc_eng_ops\tEng/Ops"]);
}
