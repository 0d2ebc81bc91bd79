use anyhow::Result;
use fixproto_schema::{parser, payload::Value};

fn main() -> Result<()> {
    let protocol = fixproto::load_bundled("fix44")?;
    let message = protocol.message_by_name("Logon").expect("bundled dictionary defines Logon");

    let header = vec![
        ("SenderCompID".to_string(), Value::str("BuySide")),
        ("TargetCompID".to_string(), Value::str("SellSide")),
        ("MsgSeqNum".to_string(), Value::str("1")),
        ("SendingTime".to_string(), Value::str("20260727-00:00:00")),
    ];
    let body = vec![
        ("EncryptMethod".to_string(), Value::str("0")),
        ("HeartBtInt".to_string(), Value::str("30")),
    ];

    let wire = message.serialize(&protocol, &header, &body, &[])?;
    println!("serialized: {}", fixproto_core::humanize(&wire));

    let parsed = parser::parse(&protocol, &wire)?;
    println!("parsed message: {}", parsed.message.name());
    println!("parsed header fields: {:?}", parsed.header);
    println!("parsed body fields: {:?}", parsed.body);

    let roundtrip = parsed.message.serialize(&protocol, &parsed.header, &parsed.body, &parsed.trailer)?;
    assert_eq!(wire, roundtrip, "a parsed message must re-serialize byte for byte");
    println!("round-trip OK ({} bytes)", wire.len());

    Ok(())
}
