use futures::future::{AbortHandle, Abortable};
use log::{debug, info};
use std::time::Duration;

use crate::game::session::{lock, ClockStatus, SharedSession};

/// Start the clock task for a session on the current actix runtime.
///
/// The task ticks every `period`, charging the player on move. It ends on
/// its own once the session stops playing, and is aborted through the handle
/// the session keeps. Returns false if the session already has a clock or is
/// not being played.
pub fn spawn_clock(session: SharedSession, period: Duration) -> bool {
    let (handle, registration) = AbortHandle::new_pair();
    if !lock(&session).attach_clock(handle) {
        debug!("clock not started");
        return false;
    }

    let task = Abortable::new(run_clock(session, period), registration);
    actix_rt::spawn(async move {
        if task.await.is_err() {
            debug!("clock task aborted");
        }
    });
    true
}

async fn run_clock(session: SharedSession, period: Duration) {
    let interval = period.as_secs_f64();
    let mut ticker = actix_rt::time::interval(period);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let status = lock(&session).tick(interval);
        if status != ClockStatus::Running {
            info!("clock stopped: {:?}", status);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::piece::Color;
    use crate::game::session::{GameSession, GameStatus, SessionSettings};
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    fn playing(total_length: f64) -> SharedSession {
        let mut session = GameSession::new(SessionSettings {
            total_length,
            per_move: 0.0,
        });
        session.connect(Uuid::new_v4(), "a");
        session.connect(Uuid::new_v4(), "b");
        Arc::new(Mutex::new(session))
    }

    #[actix_rt::test]
    async fn clock_runs_out_and_stops() {
        let session = playing(0.05);
        assert!(spawn_clock(session.clone(), Duration::from_millis(10)));

        actix_rt::time::sleep(Duration::from_millis(300)).await;

        let guard = lock(&session);
        assert_eq!(guard.state(), GameStatus::Ended);
        assert_eq!(guard.winner(), Some(Color::Black));
        let remaining = guard.player_by_color(Color::White).unwrap().remaining_time;
        assert!(remaining <= 0.0 && remaining > -0.02, "remaining {}", remaining);
        assert_eq!(guard.player_by_color(Color::Black).unwrap().remaining_time, 0.05);
    }

    #[actix_rt::test]
    async fn second_clock_is_refused() {
        let session = playing(60.0);
        assert!(spawn_clock(session.clone(), Duration::from_millis(10)));
        assert!(!spawn_clock(session.clone(), Duration::from_millis(10)));

        actix_rt::time::sleep(Duration::from_millis(100)).await;
        let guard = lock(&session);
        assert_eq!(guard.state(), GameStatus::Playing);
        assert!(guard.player_by_color(Color::White).unwrap().remaining_time < 60.0);
        assert_eq!(guard.player_by_color(Color::Black).unwrap().remaining_time, 60.0);
    }

    #[actix_rt::test]
    async fn waiting_session_gets_no_clock() {
        let mut session = GameSession::new(SessionSettings::default());
        session.connect(Uuid::new_v4(), "a");
        let session = Arc::new(Mutex::new(session));
        assert!(!spawn_clock(session, Duration::from_millis(10)));
    }
}
