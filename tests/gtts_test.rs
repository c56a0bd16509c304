use base64::Engine;
use issuecast::backends::gtts::GttsBackend;
use issuecast::backends::{SpeechBackend, VoiceProfile};
use issuecast::IssuecastError;
use mockito::{Matcher, Server};

const RPC_PATH: &str = "/_/TranslateWebserverUi/data/batchexecute";

fn reply(audio: &[u8]) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(audio);
    format!(")]}}'\n\n120\n[[\"wrb.fr\",\"jQ1olc\",\"[\\\"{payload}\\\"]\",null,null,null,\"generic\"]]\n25\n[[\"di\",42]]\n")
}

#[test]
fn test_each_chunk_is_one_rpc() {
    let mut server = Server::new();
    let rpc = server
        .mock("POST", RPC_PATH)
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::Regex("^f\\.req=.*jQ1olc".to_string()))
        .with_status(200)
        .with_body(reply(b"\xff\xfbchunk"))
        .expect(2)
        .create();

    let backend = GttsBackend::new(&server.url());
    let audio = backend
        .synthesize("First sentence here. Second one follows!", "en", VoiceProfile::Primary)
        .unwrap();

    rpc.assert();
    assert_eq!(audio, b"\xff\xfbchunk\xff\xfbchunk");
}

#[test]
fn test_http_failure_is_synthesis_error() {
    let mut server = Server::new();
    let _rpc = server.mock("POST", RPC_PATH).with_status(503).create();

    let backend = GttsBackend::new(&server.url());
    let err = backend
        .synthesize("Hello", "en", VoiceProfile::Secondary)
        .unwrap_err();
    assert!(matches!(err, IssuecastError::Synthesis(_)));
}

#[test]
fn test_nothing_speakable_makes_no_request() {
    let mut server = Server::new();
    let rpc = server.mock("POST", RPC_PATH).expect(0).create();

    let backend = GttsBackend::new(&server.url());
    let err = backend.synthesize(" --- \n", "en", VoiceProfile::Primary).unwrap_err();

    assert!(matches!(err, IssuecastError::Synthesis(_)));
    rpc.assert();
}

#[test]
fn test_profiles_use_different_accents() {
    assert_eq!(GttsBackend::tld_for(VoiceProfile::Primary), "com");
    assert_eq!(GttsBackend::tld_for(VoiceProfile::Secondary), "co.uk");
}
