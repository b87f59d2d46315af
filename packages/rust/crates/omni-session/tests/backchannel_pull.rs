//! Long-poll delivery, timeouts, supersession and shutdown.

use std::time::Duration;

use anyhow::Result;
use omni_session::{
    Envelope, PollReply, SessionConfig, SessionError, SessionPlug, TransactionalPlug,
};
use serde_json::json;

fn plug() -> SessionPlug {
    let mut plug = SessionPlug::new(SessionConfig {
        backchannel_timeout_ms: 1_000,
        ..SessionConfig::default()
    });
    plug.init();
    plug
}

fn poll_request(session_id: &str) -> Envelope {
    Envelope::request("client-app", "ca1", session_id, "pull", Vec::new())
}

fn notify_from(plug: &mut SessionPlug, from: &str, to: &str, text: &str) -> Result<()> {
    plug.begin(&Envelope::request("admin-app", "ca1", from, "notify", Vec::new()))?;
    plug.proxy()?.notify(vec![json!(text)], Some(to))?;
    plug.prepare()?;
    plug.commit()?;
    Ok(())
}

#[tokio::test]
async fn waiting_poll_receives_committed_notification_once() -> Result<()> {
    let mut plug = plug();
    let backchannel = plug.backchannel();
    let pending = backchannel.pull(&poll_request("client1"))?;
    assert!(backchannel.has_poll("client1"));

    notify_from(&mut plug, "admin", "client1", "hi")?;
    assert!(!backchannel.has_poll("client1"));
    assert!(backchannel.queued("client1").is_empty());

    match pending.recv().await {
        PollReply::Delivered(notification) => {
            assert_eq!(notification.args, vec![json!("hi")]);
            assert_eq!(
                notification.to_wire(),
                vec![json!("client-app"), json!("ca1"), json!("client1"), json!("pull"), json!("hi")]
            );
        }
        PollReply::Failed(code) => panic!("expected a notification, got {}", code.as_str()),
    }
    Ok(())
}

#[tokio::test]
async fn aborted_notification_never_reaches_poll() -> Result<()> {
    let mut plug = plug();
    let backchannel = plug.backchannel();
    let _pending = backchannel.pull(&poll_request("client1"))?;

    plug.begin(&Envelope::request("admin-app", "ca1", "admin", "notify", Vec::new()))?;
    plug.proxy()?.notify(vec![json!("nope")], Some("client1"))?;
    plug.prepare()?;
    plug.abort();

    assert!(backchannel.has_poll("client1"));
    assert!(backchannel.queued("client1").is_empty());
    Ok(())
}

#[tokio::test]
async fn queued_notifications_are_served_oldest_first() -> Result<()> {
    let mut plug = plug();
    notify_from(&mut plug, "admin", "client1", "first")?;
    notify_from(&mut plug, "admin", "client1", "second")?;
    let backchannel = plug.backchannel();

    let reply = backchannel.pull(&poll_request("client1"))?.recv().await;
    assert_eq!(reply.notification_args(), Some(&vec![json!("first")]));
    assert!(!backchannel.has_poll("client1"));
    assert_eq!(backchannel.queued("client1"), vec![vec![json!("second")]]);

    let reply = backchannel.pull(&poll_request("client1"))?.recv().await;
    assert_eq!(reply.notification_args(), Some(&vec![json!("second")]));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn idle_poll_times_out() -> Result<()> {
    let plug = plug();
    let backchannel = plug.backchannel();
    assert_eq!(backchannel.timeout(), Duration::from_millis(1_000));

    let pending = backchannel.pull(&poll_request("client1"))?;
    let reply = pending.recv().await;
    assert!(reply.is_timeout());
    assert!(!backchannel.has_poll("client1"));
    assert_eq!(backchannel.attached_polls(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn superseded_poll_gets_its_own_timeout() -> Result<()> {
    let mut plug = plug();
    let backchannel = plug.backchannel();
    let first = backchannel.pull_with_timeout(&poll_request("client1"), Duration::from_secs(5))?;
    let second = backchannel.pull_with_timeout(&poll_request("client1"), Duration::from_secs(60))?;
    assert_eq!(backchannel.attached_polls(), 1);

    notify_from(&mut plug, "admin", "client1", "for the newest poll")?;
    let reply = second.recv().await;
    assert_eq!(reply.notification_args(), Some(&vec![json!("for the newest poll")]));

    let started = tokio::time::Instant::now();
    assert!(first.recv().await.is_timeout());
    assert!(started.elapsed() <= Duration::from_secs(5));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn timer_of_superseded_poll_does_not_detach_newer_one() -> Result<()> {
    let plug = plug();
    let backchannel = plug.backchannel();
    let first = backchannel.pull_with_timeout(&poll_request("client1"), Duration::from_secs(1))?;
    let _second = backchannel.pull_with_timeout(&poll_request("client1"), Duration::from_secs(60))?;

    assert!(first.recv().await.is_timeout());
    assert!(backchannel.has_poll("client1"));
    Ok(())
}

#[tokio::test]
async fn shutdown_answers_every_waiting_poll() -> Result<()> {
    let mut plug = plug();
    let backchannel = plug.backchannel();
    let one = backchannel.pull(&poll_request("client1"))?;
    let two = backchannel.pull(&poll_request("client2"))?;
    assert_eq!(backchannel.attached_polls(), 2);

    plug.shutdown();
    assert_eq!(backchannel.attached_polls(), 0);
    assert!(one.recv().await.is_timeout());
    assert!(two.recv().await.is_timeout());
    Ok(())
}

#[tokio::test]
async fn pull_after_shutdown_times_out_immediately() -> Result<()> {
    let mut plug = plug();
    let backchannel = plug.backchannel();
    plug.shutdown();

    let late = backchannel.pull_with_timeout(&poll_request("client1"), Duration::from_secs(3_600))?;
    assert!(!backchannel.has_poll("client1"));
    let reply = tokio::time::timeout(Duration::from_secs(1), late.recv()).await?;
    assert!(reply.is_timeout());

    // A fresh start accepts polls again.
    plug.init();
    let _waiting = backchannel.pull(&poll_request("client1"))?;
    assert!(backchannel.has_poll("client1"));
    Ok(())
}

#[tokio::test]
async fn notification_for_abandoned_poll_is_queued() -> Result<()> {
    let mut plug = plug();
    let backchannel = plug.backchannel();
    drop(backchannel.pull(&poll_request("client1"))?);

    notify_from(&mut plug, "admin", "client1", "kept")?;
    assert_eq!(backchannel.queued("client1"), vec![vec![json!("kept")]]);
    assert!(!backchannel.has_poll("client1"));
    Ok(())
}

#[tokio::test]
async fn pull_without_session_id_is_rejected() {
    let plug = plug();
    let request = Envelope {
        from: "client-app".to_string(),
        to: "ca1".to_string(),
        session_id: None,
        method: "pull".to_string(),
        args: Vec::new(),
    };
    let err = plug.backchannel().pull(&request).expect_err("no session id");
    assert!(matches!(err, SessionError::MissingSessionId { .. }));
}

#[tokio::test]
async fn resume_releases_polls_before_restoring() -> Result<()> {
    let mut plug = plug();
    let backchannel = plug.backchannel();
    let pending = backchannel.pull(&poll_request("client1"))?;

    plug.resume(omni_session::Checkpoint::default())?;
    assert!(pending.recv().await.is_timeout());
    assert_eq!(backchannel.session_count(), 0);
    Ok(())
}
