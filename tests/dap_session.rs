use std::io::Cursor;

use serde_json::{json, Value};

use neovm_debugger::dap::{run_dap_mode, DapServer};

// Frames one request the way a DAP client sends it
fn request(seq: u64, command: &str, arguments: Value) -> String {
    let body = json!({
        "seq": seq,
        "type": "request",
        "command": command,
        "arguments": arguments
    })
    .to_string();
    format!("Content-Length: {}\r\n\r\n{}", body.len(), body)
}

// Splits the adapter's output back into JSON messages
fn messages(output: &[u8]) -> Vec<Value> {
    let text = String::from_utf8(output.to_vec()).expect("output is not UTF-8");
    let mut rest = text.as_str();
    let mut out = Vec::new();
    while let Some(start) = rest.find("Content-Length: ") {
        let header = &rest[start + "Content-Length: ".len()..];
        let end = header.find("\r\n\r\n").expect("unterminated header");
        let len: usize = header[..end].trim().parse().expect("bad length");
        let body = &header[end + 4..end + 4 + len];
        out.push(serde_json::from_str(body).expect("bad message body"));
        rest = &header[end + 4 + len..];
    }
    out
}

fn run(requests: &[String]) -> Vec<Value> {
    let input = requests.concat();
    let mut output = Vec::new();
    run_dap_mode(Cursor::new(input), &mut output, None).expect("session failed");
    messages(&output)
}

fn response<'a>(msgs: &'a [Value], command: &str) -> &'a Value {
    msgs.iter()
        .find(|m| m["type"] == "response" && m["command"] == command)
        .unwrap_or_else(|| panic!("no {} response", command))
}

fn events<'a>(msgs: &'a [Value], name: &str) -> Vec<&'a Value> {
    msgs.iter()
        .filter(|m| m["type"] == "event" && m["event"] == name)
        .collect()
}

#[cfg(test)]
mod dap_tests {
    use super::*;

    #[test]
    fn test_breakpoint_session() {
        let msgs = run(&[
            request(1, "initialize", json!({ "adapterID": "neovm" })),
            // PUSH1 PUSH2 ADD PUSH6 ADD
            request(2, "launch", json!({ "script": "11129e169e", "stopOnEntry": true })),
            request(
                3,
                "setBreakpoints",
                json!({ "breakpoints": [{ "line": 3 }, { "line": 9 }] }),
            ),
            request(4, "configurationDone", json!({})),
            request(5, "continue", json!({ "threadId": 1 })),
            request(6, "variables", json!({ "variablesReference": 1 })),
            request(7, "stackTrace", json!({ "threadId": 1 })),
            request(8, "continue", json!({ "threadId": 1 })),
            request(9, "disconnect", json!({})),
        ]);

        let kinds: Vec<String> = msgs
            .iter()
            .map(|m| match m["type"].as_str() {
                Some("event") => format!("event:{}", m["event"].as_str().unwrap()),
                _ => format!("response:{}", m["command"].as_str().unwrap()),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "response:initialize",
                "event:initialized",
                "response:launch",
                "response:setBreakpoints",
                "response:configurationDone",
                "event:stopped",
                "response:continue",
                "event:stopped",
                "response:variables",
                "response:stackTrace",
                "response:continue",
                "event:output",
                "event:terminated",
                "response:disconnect",
            ]
        );

        let init = response(&msgs, "initialize");
        assert_eq!(init["success"], true);
        assert_eq!(init["request_seq"], 1);
        assert_eq!(init["body"]["supportsConfigurationDoneRequest"], true);

        let bps = &response(&msgs, "setBreakpoints")["body"]["breakpoints"];
        assert_eq!(bps[0]["verified"], true);
        assert_eq!(bps[1]["verified"], false);

        let stopped = events(&msgs, "stopped");
        assert_eq!(stopped[0]["body"]["reason"], "entry");
        assert_eq!(stopped[1]["body"]["reason"], "breakpoint");

        let vars = &response(&msgs, "variables")["body"]["variables"];
        assert_eq!(vars[0]["value"], "2");
        assert_eq!(vars[1]["value"], "1");
        assert_eq!(vars[0]["type"], "Integer");

        let trace = &response(&msgs, "stackTrace")["body"];
        assert_eq!(trace["totalFrames"], 1);
        assert_eq!(trace["stackFrames"][0]["line"], 3);
        assert_eq!(trace["stackFrames"][0]["name"], "entry @ ADD");

        let output = &events(&msgs, "output")[0]["body"];
        assert_eq!(output["category"], "stdout");
        assert_eq!(output["output"], "[{\"type\":\"Integer\",\"value\":\"9\"}]\n");

        // Sequence numbers count up from one
        let seqs: Vec<u64> = msgs.iter().map(|m| m["seq"].as_u64().unwrap()).collect();
        assert_eq!(seqs, (1..=msgs.len() as u64).collect::<Vec<_>>());
    }

    #[test]
    fn test_stepping_requests() {
        let msgs = run(&[
            // PUSH2 CALL +4 NOP RET PUSH3 ADD RET
            request(1, "launch", json!({ "script": "1234042140139e40" })),
            request(2, "configurationDone", json!({})),
            request(3, "next", json!({ "threadId": 1 })),
            request(4, "stepIn", json!({ "threadId": 1 })),
            request(5, "stackTrace", json!({ "threadId": 1 })),
            request(6, "stepOut", json!({ "threadId": 1 })),
            request(7, "source", json!({ "sourceReference": 1 })),
        ]);

        let stopped = events(&msgs, "stopped");
        let reasons: Vec<&str> = stopped
            .iter()
            .map(|e| e["body"]["reason"].as_str().unwrap())
            .collect();
        assert_eq!(reasons, vec!["entry", "step", "step", "step"]);

        let trace = &response(&msgs, "stackTrace")["body"];
        assert_eq!(trace["totalFrames"], 2);
        assert_eq!(trace["stackFrames"][0]["name"], "call #1 @ PUSH3");
        assert_eq!(trace["stackFrames"][0]["line"], 5);
        assert_eq!(trace["stackFrames"][1]["name"], "entry @ NOP");

        let source = response(&msgs, "source")["body"]["content"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(source.starts_with("0 PUSH2\n1 CALL 5\n3 NOP\n"), "{}", source);
    }

    #[test]
    fn test_failures_are_reported() {
        let mut input = request(1, "launch", json!({}));
        input.push_str("Content-Length: 5\r\n\r\nnot j");
        let msgs = run(&[
            input,
            request(2, "evaluate", json!({ "expression": "1" })),
            // PUSH1 ABORT
            request(3, "launch", json!({ "script": "1138", "stopOnEntry": false })),
            request(4, "configurationDone", json!({})),
        ]);

        let launch = &msgs[0];
        assert_eq!(launch["success"], false);
        assert_eq!(launch["message"], "missing argument: program");

        let evaluate = response(&msgs, "evaluate");
        assert_eq!(evaluate["success"], false);
        assert!(evaluate["message"]
            .as_str()
            .unwrap()
            .contains("unsupported request"));

        let output = &events(&msgs, "output")[0]["body"];
        assert_eq!(output["category"], "stderr");
        assert!(output["output"]
            .as_str()
            .unwrap()
            .starts_with("Error: at instruction 1 (ABORT)"));
        assert_eq!(events(&msgs, "stopped")[0]["body"]["reason"], "exception");
    }

    #[test]
    fn test_oversized_frame_does_not_end_session() {
        let oversized = "Content-Length: 18446744073709551615\r\n\r\n".to_string();
        let msgs = run(&[oversized, request(1, "initialize", json!({}))]);

        assert_eq!(response(&msgs, "initialize")["success"], true);
        assert_eq!(events(&msgs, "initialized").len(), 1);
    }

    #[test]
    fn test_server_launch_loads_program() {
        let mut output = Vec::new();
        {
            let mut server = DapServer::new(Cursor::new(Vec::new()), &mut output, None);
            server
                .handle_launch(1, "launch".to_string(), Some(json!({ "script": "11" })))
                .unwrap();
            assert!(server.context().is_loaded());
            assert!(server.read_message().unwrap().is_none());
        }
        let msgs = messages(&output);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0]["success"], true);
    }
}
