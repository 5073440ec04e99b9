//! A test-style walkthrough: a background task drives a session store while
//! the main task records and awaits actions through an `ActionSpy`.
//!
//! A `tracing` subscriber at DEBUG makes the spy's bookkeeping visible.

use std::{sync::Arc, time::Duration};

use action_spy::*;

#[derive(Action, Clone, Debug)]
enum Session {
    LoginRequested { user: String },
    LoginSucceeded { user: String },
    #[action(rename = "session/logout")]
    Logout,
}

#[derive(Clone, Debug, Default)]
struct SessionState {
    user: Option<String>,
    attempts: u32,
}

fn reducer(state: &SessionState, action: &Session) -> SessionState {
    let mut next = state.clone();
    match action {
        Session::LoginRequested { .. } => next.attempts += 1,
        Session::LoginSucceeded { user } => next.user = Some(user.clone()),
        Session::Logout => next.user = None,
    }
    next
}

#[tokio::main]
async fn main() -> Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let spy = ActionSpy::<Session>::with_config(
        Config::default().with_wait_timeout(Duration::from_secs(2)),
    );
    let store = Arc::new(
        StoreBuilder::new(reducer, SessionState::default())
            .with_middleware(spy.clone())
            .build(),
    );

    // Registered before anything is dispatched, so only future actions count.
    let logged_in = spy.until_next("LoginSucceeded");

    let backend = store.clone();
    let worker = tokio::spawn(async move {
        backend.dispatch(Session::LoginRequested {
            user: "ada".into(),
        })?;
        tokio::time::sleep(Duration::from_millis(20)).await;
        backend.dispatch(Session::LoginSucceeded {
            user: "ada".into(),
        })?;
        Ok::<_, Error>(())
    });

    let action = logged_in.await?;
    println!("observed {:?}", action);

    // Already recorded, so `until` answers straight from the ledger.
    let request = spy.until(Regex::new("^Login")?).await?;
    println!("latest login action: {}", request.action_type());

    worker
        .await
        .map_err(Error::downstream)??;

    store.dispatch(Session::Logout)?;
    println!(
        "{} actions recorded, {} logouts, state: {:?}",
        spy.len(),
        spy.count("session/logout"),
        store.state()
    );
    Ok(())
}
