//! Demo entity: a chat-style notifier plus an exactly-once shopping counter.

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value, json};

use super::entity::{EntityMethods, MethodContext};

/// Queue bound of `client1` and `client2`, set on the first pulse.
const CLIENT_QUEUE_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct HelloMethods;

impl EntityMethods for HelloMethods {
    fn initial_state(&self) -> Value {
        json!({ "counter": 0, "counters": {} })
    }

    fn invoke(&self, ctx: &mut MethodContext<'_>, method: &str, args: &[Value]) -> Result<Value> {
        match method {
            "notify" => {
                let msg = arg(args, 0, method)?.clone();
                let targets = ctx.session.notify(vec![msg], opt_str(args, 1))?;
                Ok(json!(targets))
            }
            "notifyAll" => {
                let msg = arg(args, 0, method)?.clone();
                for id in ctx.session.all_session_ids() {
                    ctx.session.notify(vec![msg.clone()], Some(&id))?;
                }
                session_info(ctx)
            }
            "sessionInfo" => session_info(ctx),
            "limitQueue" => {
                let max = arg(args, 0, method)?
                    .as_i64()
                    .context("limitQueue: `max` must be an integer")?;
                let targets = ctx.session.limit_queue(max, opt_str(args, 1))?;
                Ok(json!(targets))
            }
            "pulse" => pulse(ctx),
            "begin" => Ok(serde_json::to_value(ctx.session.begin()?)?),
            "buy" => {
                let nonce = str_arg(args, 0, method)?;
                let index = arg(args, 1, method)?.clone();
                let item = str_arg(args, 2, method)?;
                if !ctx.session.remember(nonce, index)? {
                    bail!("ignoring buy of `{item}`: bad nonce");
                }
                let counters = counters_mut(ctx.state)?;
                let next = counters.get(item).and_then(Value::as_i64).unwrap_or(0) + 1;
                counters.insert(item.to_string(), json!(next));
                Ok(Value::Object(counters.clone()))
            }
            "end" => {
                let nonce = str_arg(args, 0, method)?;
                Ok(json!(ctx.session.end(nonce)?))
            }
            "getCounters" => Ok(ctx.state.get("counters").cloned().unwrap_or_else(|| json!({}))),
            other => bail!("unknown method `{other}`"),
        }
    }
}

/// `{current, <id>: outq}` for every known session.
fn session_info(ctx: &MethodContext<'_>) -> Result<Value> {
    let mut info = Map::new();
    info.insert("current".to_string(), json!(ctx.session.session_id()));
    for id in ctx.session.all_session_ids() {
        let outq = ctx.session.outq(Some(&id))?;
        info.insert(id, json!(outq));
    }
    Ok(Value::Object(info))
}

/// Bump the counter; even values go to `client1`, multiples of three to `client2`.
fn pulse(ctx: &mut MethodContext<'_>) -> Result<Value> {
    let counter = ctx.state.get("counter").and_then(Value::as_i64).unwrap_or(0) + 1;
    ctx.state
        .as_object_mut()
        .context("entity state is not an object")?
        .insert("counter".to_string(), json!(counter));
    if counter == 1 {
        ctx.session.limit_queue(CLIENT_QUEUE_LIMIT, Some("client1"))?;
        ctx.session.limit_queue(CLIENT_QUEUE_LIMIT, Some("client2"))?;
    }
    if counter % 2 == 0 {
        ctx.session.notify(vec![json!(counter)], Some("client1"))?;
    }
    if counter % 3 == 0 {
        ctx.session.notify(vec![json!(counter)], Some("client2"))?;
    }
    Ok(json!(counter))
}

fn counters_mut(state: &mut Value) -> Result<&mut Map<String, Value>> {
    state
        .as_object_mut()
        .context("entity state is not an object")?
        .entry("counters")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .context("`counters` is not an object")
}

fn arg<'a>(args: &'a [Value], index: usize, method: &str) -> Result<&'a Value> {
    args.get(index)
        .with_context(|| format!("{method}: missing argument #{index}"))
}

fn str_arg<'a>(args: &'a [Value], index: usize, method: &str) -> Result<&'a str> {
    arg(args, index, method)?
        .as_str()
        .with_context(|| format!("{method}: argument #{index} must be a string"))
}

fn opt_str(args: &[Value], index: usize) -> Option<&str> {
    args.get(index).and_then(Value::as_str)
}
