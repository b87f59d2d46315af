//! prepare → persist → resume: crash recovery replays the journal of the
//! transaction that was being committed.

use anyhow::Result;
use omni_session::{
    Checkpoint, Envelope, Intent, SessionConfig, SessionError, SessionPlug, SessionProxy,
    TransactionalPlug, TxPhase,
};
use serde_json::{Value, json};

fn plug() -> SessionPlug {
    let mut plug = SessionPlug::new(SessionConfig::default());
    plug.init();
    plug
}

fn request(session_id: &str) -> Envelope {
    Envelope::request("client", "ca1", session_id, "test", Vec::new())
}

fn transact(
    plug: &mut SessionPlug,
    session_id: &str,
    body: impl FnOnce(&mut SessionProxy<'_>) -> Result<()>,
) -> Result<()> {
    plug.begin(&request(session_id))?;
    body(&mut plug.proxy()?)?;
    plug.prepare()?;
    plug.commit()?;
    Ok(())
}

/// Sessions with queued messages, a custom limit, an open nonce and a memento.
fn populated() -> Result<SessionPlug> {
    let mut plug = plug();
    transact(&mut plug, "foo", |s| {
        s.notify(vec![json!("hello"), json!("world")], None)?;
        s.limit_queue(5, None)?;
        Ok(())
    })?;
    let mut nonce = String::new();
    transact(&mut plug, "bar", |s| {
        nonce = s.begin()?.nonce;
        Ok(())
    })?;
    transact(&mut plug, "bar", |s| {
        assert!(s.remember(&nonce, json!({"item": 3}))?);
        s.notify(vec![json!("bye")], None)?;
        Ok(())
    })?;
    Ok(plug)
}

#[test]
fn checkpoint_round_trip_preserves_every_record_field() -> Result<()> {
    let mut original = populated()?;
    original.begin(&request("foo"))?;
    let checkpoint = original.prepare()?;
    assert!(checkpoint.journal.is_empty());
    original.commit()?;

    let raw = checkpoint.to_json()?;
    let mut restored = plug();
    restored.resume(Checkpoint::from_json(&raw)?)?;

    assert_eq!(restored.committed(), original.committed());
    let ids: Vec<&str> = checkpoint.sessions.ids().collect();
    assert_eq!(ids, vec!["foo", "bar"]);
    Ok(())
}

#[test]
fn crash_between_prepare_and_commit_is_recovered_by_replay() -> Result<()> {
    let mut original = populated()?;
    original.begin(&request("foo"))?;
    {
        let mut s = original.proxy()?;
        s.notify(vec![json!("late")], Some("bar"))?;
        s.notify(vec![json!("later")], None)?;
    }
    let checkpoint = original.prepare()?;
    assert_eq!(checkpoint.journal.len(), 2);
    // The process dies here; the checkpoint is all that survives.

    let mut restored = plug();
    restored.resume(checkpoint.clone())?;
    original.commit()?;
    assert_eq!(restored.committed(), original.committed());

    // Resuming the same checkpoint again lands on the same state.
    let mut again = plug();
    again.resume(checkpoint)?;
    assert_eq!(again.committed(), restored.committed());
    Ok(())
}

#[test]
fn checkpoint_json_shape() -> Result<()> {
    let mut plug = plug();
    plug.begin(&request("foo"))?;
    plug.proxy()?.notify(vec![json!("hi")], None)?;
    let value = plug.prepare()?.to_value()?;
    plug.abort();

    assert_eq!(
        value,
        json!({
            "sessions": {
                "foo": {"messages": [], "nonce": null, "memento": null, "limit": 100}
            },
            "journal": [
                {"op": "notify", "sessionId": "foo", "args": ["hi"]}
            ]
        })
    );
    Ok(())
}

#[test]
fn checkpoint_keeps_session_creation_order() -> Result<()> {
    let raw = r#"{
        "sessions": {
            "zeta": {"messages": [["z"]], "limit": 10},
            "alpha": {"messages": [], "nonce": "n1", "memento": 7, "limit": 10}
        },
        "journal": [{"op": "end", "sessionId": "alpha"}]
    }"#;
    let checkpoint = Checkpoint::from_json(raw)?;
    assert_eq!(checkpoint.journal, vec![Intent::End { session_id: "alpha".to_string() }]);

    let mut plug = plug();
    plug.resume(checkpoint)?;
    let committed = plug.committed();
    let ids: Vec<&str> = committed.ids().collect();
    assert_eq!(ids, vec!["zeta", "alpha"]);
    let alpha = committed.get("alpha").cloned();
    assert!(alpha.is_some_and(|r| r.nonce().is_none() && r.memento().is_none()));
    assert_eq!(
        committed.get("zeta").map(|r| r.outq()),
        Some(vec![vec![Value::from("z")]])
    );
    Ok(())
}

#[test]
fn value_round_trip_keeps_session_creation_order() -> Result<()> {
    let mut original = plug();
    transact(&mut original, "zeta", |s| {
        s.notify(vec![json!("z")], None)?;
        Ok(())
    })?;
    original.begin(&request("alpha"))?;
    original.proxy()?.notify(vec![json!("a")], Some("zeta"))?;
    let value = original.prepare()?.to_value()?;
    original.abort();

    let mut restored = plug();
    restored.resume(Checkpoint::from_value(value)?)?;
    let committed = restored.committed();
    let ids: Vec<&str> = committed.ids().collect();
    assert_eq!(ids, vec!["zeta", "alpha"]);
    assert_eq!(
        committed.get("zeta").map(|r| r.outq()),
        Some(vec![vec![json!("z")], vec![json!("a")]])
    );
    Ok(())
}

#[test]
fn resume_requires_idle_plug() -> Result<()> {
    let mut plug = plug();
    plug.begin(&request("foo"))?;
    let err = plug
        .resume(Checkpoint::default())
        .expect_err("resume during transaction");
    assert!(matches!(
        err,
        SessionError::InvalidTransition {
            from: TxPhase::Began,
            op: "resume"
        }
    ));
    Ok(())
}

#[test]
fn malformed_checkpoint_is_rejected() {
    let err = Checkpoint::from_json(r#"{"journal": [{"op": "explode"}]}"#)
        .expect_err("unknown op");
    assert!(matches!(err, SessionError::Checkpoint(_)));
}
