/// Deserialization tests for `Message` using representative stream-json
/// payloads captured from the Claude CLI protocol.
#[cfg(test)]
mod unit {
    use crate::types::{
        ContentBlock, Message, ResultSubtype, SystemPayload, UserContentBody,
    };

    fn parse(json: &str) -> Message {
        serde_json::from_str(json).expect("failed to parse message")
    }

    #[test]
    fn parse_system_init() {
        let json = r#"{
            "type": "system",
            "subtype": "init",
            "session_id": "abc-123",
            "model": "claude-sonnet-4-6",
            "tools": ["Read", "Bash", "Edit"],
            "mcp_servers": [{"name": "github", "status": "connected"}],
            "permissionMode": "acceptEdits",
            "claude_code_version": "1.0.0",
            "cwd": "/tmp"
        }"#;
        let msg = parse(json);
        assert_eq!(msg.kind(), "system");
        let init = msg.as_init().expect("expected system/init");
        assert_eq!(init.model, "claude-sonnet-4-6");
        assert_eq!(init.tools.len(), 3);
        assert_eq!(init.mcp_servers[0].name, "github");
        assert_eq!(init.permission_mode.as_deref(), Some("acceptEdits"));
    }

    #[test]
    fn parse_system_unknown_subtype() {
        let json = r#"{
            "type": "system",
            "subtype": "some_future_subtype",
            "session_id": "abc-123"
        }"#;
        let Message::System(sys) = parse(json) else {
            panic!("expected System")
        };
        assert!(matches!(sys.payload, SystemPayload::Unknown(_)));
    }

    #[test]
    fn unknown_system_subtype_reserializes_verbatim() {
        let raw = serde_json::json!({
            "type": "system",
            "subtype": "hook_response",
            "session_id": "s1",
            "hook_name": "x",
            "stdout": "hi"
        });
        let msg: Message = serde_json::from_value(raw.clone()).unwrap();
        assert!(msg.as_init().is_none());
        assert_eq!(serde_json::to_value(&msg).unwrap(), raw);
    }

    #[test]
    fn unknown_content_blocks_reserialize_verbatim() {
        let raw = serde_json::json!({
            "type": "assistant",
            "session_id": "s1",
            "parent_tool_use_id": null,
            "message": {
                "id": "m1",
                "role": "assistant",
                "model": "sonnet",
                "content": [
                    {"type": "redacted_thinking", "data": "abc"},
                    {"type": "text", "text": "visible"}
                ]
            }
        });
        let msg: Message = serde_json::from_value(raw.clone()).unwrap();
        let asst = msg.as_assistant().unwrap();
        assert_eq!(
            asst.message.content[0],
            ContentBlock::Other(serde_json::json!({"type": "redacted_thinking", "data": "abc"}))
        );
        assert_eq!(asst.text(), Some("visible"));
        assert_eq!(serde_json::to_value(&msg).unwrap(), raw);

        let user = serde_json::json!({
            "type": "user",
            "session_id": "s1",
            "parent_tool_use_id": null,
            "message": {
                "role": "user",
                "content": [{"type": "image", "source": {"type": "base64", "data": "AA=="}}]
            }
        });
        let msg: Message = serde_json::from_value(user.clone()).unwrap();
        assert_eq!(serde_json::to_value(&msg).unwrap(), user);
    }

    #[test]
    fn empty_first_text_block_counts_as_no_text() {
        let msg = parse(
            r#"{"type":"assistant","message":{"content":[
                {"type":"text","text":""},
                {"type":"text","text":"later"}
            ]}}"#,
        );
        let asst = msg.as_assistant().unwrap();
        assert_eq!(asst.first_text_block(), Some(""));
        assert_eq!(asst.text(), None);
    }

    #[test]
    fn parse_result_success() {
        let json = r#"{
            "type": "result",
            "subtype": "success",
            "session_id": "abc-123",
            "result": "Done! I wrote the function.",
            "duration_ms": 5000,
            "duration_api_ms": 4800,
            "is_error": false,
            "num_turns": 3,
            "stop_reason": "end_turn",
            "total_cost_usd": 0.0042,
            "usage": {
                "input_tokens": 1200,
                "output_tokens": 400
            }
        }"#;
        let msg = parse(json);
        let result = msg.as_result().expect("expected Result");
        assert!(result.is_success());
        assert_eq!(result.session_id, "abc-123");
        assert_eq!(result.result_text(), Some("Done! I wrote the function."));
        assert_eq!(result.num_turns, 3);
        assert_eq!(result.usage.input_tokens, 1200);
        assert!((result.total_cost_usd - 0.0042).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_result_error_max_turns() {
        let json = r#"{
            "type": "result",
            "subtype": "error_max_turns",
            "session_id": "abc-123",
            "duration_ms": 10000,
            "is_error": true,
            "num_turns": 10,
            "stop_reason": null,
            "total_cost_usd": 0.02,
            "usage": {"input_tokens": 5000, "output_tokens": 1000},
            "errors": ["Reached maximum turn limit"]
        }"#;
        let msg = parse(json);
        let result = msg.as_result().expect("expected Result");
        assert!(!result.is_success());
        assert_eq!(result.subtype, ResultSubtype::ErrorMaxTurns);
        assert_eq!(result.result_text(), None);
        assert_eq!(result.error_text(), None);
    }

    #[test]
    fn result_with_error_field_and_empty_result() {
        let msg = parse(
            r#"{"type":"result","subtype":"error_during_execution","result":"","error":"boom"}"#,
        );
        let result = msg.as_result().unwrap();
        assert_eq!(result.result_text(), None);
        assert_eq!(result.error_text(), Some("boom"));
        assert_eq!(result.duration_ms, 0);
    }

    #[test]
    fn unknown_result_subtype_round_trips_verbatim() {
        let msg = parse(r#"{"type":"result","subtype":"error_something_new"}"#);
        let result = msg.as_result().unwrap();
        assert_eq!(
            result.subtype,
            ResultSubtype::Other("error_something_new".into())
        );
        let back = serde_json::to_value(&msg).unwrap();
        assert_eq!(back["type"], "result");
        assert_eq!(back["subtype"], "error_something_new");
    }

    #[test]
    fn parse_assistant_message() {
        let json = r#"{
            "type": "assistant",
            "session_id": "abc-123",
            "parent_tool_use_id": null,
            "message": {
                "id": "msg_abc",
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "Let me read the file."},
                    {"type": "tool_use", "id": "tu_1", "name": "Read", "input": {"file_path": "/tmp/foo.txt"}}
                ],
                "model": "claude-sonnet-4-6",
                "stop_reason": "tool_use",
                "usage": {"input_tokens": 100, "output_tokens": 50}
            }
        }"#;
        let msg = parse(json);
        let asst = msg.as_assistant().expect("expected Assistant");
        assert_eq!(asst.session_id, "abc-123");
        assert_eq!(asst.message.content.len(), 2);
        assert_eq!(asst.text(), Some("Let me read the file."));
        assert!(!asst.starts_with_tool_use());
    }

    #[test]
    fn assistant_tool_use_first_and_unknown_blocks() {
        let msg = parse(
            r#"{"type":"assistant","message":{"content":[
                {"type":"tool_use","name":"Bash","input":{"command":"ls"}},
                {"type":"redacted_thinking","data":"xyz"}
            ]}}"#,
        );
        let asst = msg.as_assistant().unwrap();
        assert!(asst.starts_with_tool_use());
        assert_eq!(asst.text(), None);
        assert!(matches!(asst.message.content[1], ContentBlock::Other(_)));
    }

    #[test]
    fn parse_user_message_with_string_or_blocks() {
        let Message::User(plain) =
            parse(r#"{"type":"user","message":{"role":"user","content":"hi"}}"#)
        else {
            panic!("expected User")
        };
        assert_eq!(plain.message.content, UserContentBody::Text("hi".into()));
        assert!(!plain.has_tool_result());

        let Message::User(tool) = parse(
            r#"{"type":"user","message":{"role":"user","content":[
                {"type":"tool_result","tool_use_id":"tu_1","content":"file body"}
            ]}}"#,
        ) else {
            panic!("expected User")
        };
        assert!(tool.has_tool_result());
    }

    #[test]
    fn parse_tool_progress() {
        let json = r#"{
            "type": "tool_progress",
            "tool_use_id": "tu_1",
            "tool_name": "Bash",
            "parent_tool_use_id": null,
            "elapsed_time_seconds": 2.5,
            "session_id": "abc-123"
        }"#;
        let Message::ToolProgress(tp) = parse(json) else {
            panic!("expected ToolProgress")
        };
        assert_eq!(tp.tool_name, "Bash");
        assert!((tp.elapsed_time_seconds - 2.5).abs() < f64::EPSILON);
    }
}
