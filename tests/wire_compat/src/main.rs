fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use hubdrop_protocol::{
        ChunkBody, ChunkHeader, Compression, FinalPart, Message, MultipartMessage, StatusHeader,
        StatusReport,
    };
    use hubdrop_session::ProvisioningPayload;
    use hubdrop_transfer::Reassembler;

    const ID: &str = "9b2f7c1e-4d3a-4b8e-a1f0-5c6d7e8f9a0b";
    const FILEPATH: &str = "myDevice/logs/boot.log";

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    fn load_message(name: &str) -> Message {
        serde_json::from_value(load_fixture(name))
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent comparison).
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  rust:    {reserialized}"
        );
    }

    // --- Envelope round trips ---

    #[test]
    fn fixture_chunk_message() {
        roundtrip_test::<Message>("chunk_message.json");
    }

    #[test]
    fn fixture_final_chunk_message() {
        roundtrip_test::<Message>("final_chunk_message.json");
    }

    #[test]
    fn fixture_status_message() {
        roundtrip_test::<Message>("status_message.json");
    }

    #[test]
    fn fixture_status_report() {
        roundtrip_test::<StatusReport>("status_report_failed.json");
    }

    #[test]
    fn fixture_registration_payload() {
        roundtrip_test::<ProvisioningPayload>("registration_payload.json");
    }

    // --- Builders produce the pinned wire form ---

    #[test]
    fn chunk_builder_matches_fixture() {
        let header = ChunkHeader {
            id: ID.into(),
            filepath: FILEPATH.into(),
            part: 1,
            last: None,
        };
        let body = ChunkBody {
            data: "eJzLSM3JyVfIKE1KKcov0FHIwMPlAgBv6hAb".into(),
        };
        assert_eq!(
            Message::chunk(&header, &body).unwrap(),
            load_message("chunk_message.json")
        );
    }

    #[test]
    fn final_chunk_builder_matches_fixture() {
        let header = ChunkHeader {
            id: ID.into(),
            filepath: FILEPATH.into(),
            part: 2,
            last: Some(FinalPart {
                max_part: 2,
                compression: Compression::Deflate,
            }),
        };
        let body = ChunkBody {
            data: "eJxzdHIGAAGNAMc=".into(),
        };
        assert_eq!(
            Message::chunk(&header, &body).unwrap(),
            load_message("final_chunk_message.json")
        );
    }

    #[test]
    fn status_builder_matches_fixture() {
        let header = StatusHeader {
            id: ID.into(),
            filepath: FILEPATH.into(),
            totals: FinalPart {
                max_part: 2,
                compression: Compression::Deflate,
            },
        };
        let report = StatusReport {
            filename: "./logs/boot.log".into(),
            filepath: FILEPATH.into(),
            status: 200,
            message: "completed".into(),
            size: 1,
        };
        assert_eq!(
            Message::status(&header, &report).unwrap(),
            load_message("status_message.json")
        );
    }

    // --- Classification ---

    #[test]
    fn status_message_has_no_part() {
        let msg = load_message("status_message.json");
        assert!(msg.property("part").is_none());
        match MultipartMessage::parse(&msg).unwrap() {
            MultipartMessage::Status { header, report } => {
                assert_eq!(header.totals.max_part, 2);
                assert!(report.is_success());
            }
            other => panic!("expected status, got {other:?}"),
        }
    }

    #[test]
    fn only_final_chunk_carries_totals() {
        let first = MultipartMessage::parse(&load_message("chunk_message.json")).unwrap();
        let last = MultipartMessage::parse(&load_message("final_chunk_message.json")).unwrap();
        match (first, last) {
            (
                MultipartMessage::Chunk { header: h1, .. },
                MultipartMessage::Chunk { header: h2, .. },
            ) => {
                assert!(h1.last.is_none());
                assert_eq!(
                    h2.last,
                    Some(FinalPart {
                        max_part: 2,
                        compression: Compression::Deflate,
                    })
                );
            }
            other => panic!("expected two chunks, got {other:?}"),
        }
    }

    // --- Receiver view ---

    #[test]
    fn fixture_set_reassembles_in_any_order() {
        let names = [
            "status_message.json",
            "final_chunk_message.json",
            "chunk_message.json",
        ];
        let mut rx = Reassembler::new();
        let mut file = None;
        for name in names {
            if let Some(done) = rx.accept(&load_message(name)).unwrap() {
                file = Some(done);
            }
        }
        let file = file.expect("set should complete");
        assert_eq!(file.id, ID);
        assert_eq!(file.filepath, FILEPATH);
        assert_eq!(
            file.data,
            b"hello hubdrop, hello hubdrop, hello hubdrop\nABC".to_vec()
        );
    }
}
