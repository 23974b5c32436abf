use std::{collections::HashMap, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::domain::UserId;

/// Per-sender pacing of outbound forwards.
///
/// Spacing is measured from one send initiation to the next. Senders never
/// wait on each other.
#[derive(Debug)]
pub struct SendPacer {
    interval: Duration,
    last_send: Mutex<HashMap<UserId, Instant>>,
}

impl SendPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_send: Mutex::new(HashMap::new()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until `user` may send again, then record the send.
    ///
    /// The slot is reserved before sleeping, so concurrent callers for the same
    /// sender queue up one interval apart. Returns the wait applied.
    pub async fn apply_delay(&self, user: UserId) -> Duration {
        let wait = {
            let mut map = self.last_send.lock().await;
            reserve(&mut map, user, self.interval, Instant::now())
        };
        if wait > Duration::ZERO {
            tracing::debug!(user = user.0, wait_ms = wait.as_millis() as u64, "pacing send");
            sleep(wait).await;
        }
        wait
    }

    /// Instant of the most recent send initiation for `user`.
    pub async fn last_send(&self, user: UserId) -> Option<Instant> {
        self.last_send.lock().await.get(&user).copied()
    }
}

fn reserve(
    map: &mut HashMap<UserId, Instant>,
    user: UserId,
    interval: Duration,
    now: Instant,
) -> Duration {
    let start = match map.get(&user) {
        Some(&last) => (last + interval).max(now),
        None => now,
    };
    map.insert(user, start);
    start.saturating_duration_since(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[tokio::test(start_paused = true)]
    async fn first_send_does_not_wait() {
        let pacer = SendPacer::new(ms(500));
        let now = Instant::now();

        assert_eq!(pacer.apply_delay(UserId(1)).await, Duration::ZERO);
        assert_eq!(pacer.last_send(UserId(1)).await, Some(now));
    }

    #[tokio::test(start_paused = true)]
    async fn second_send_waits_for_remaining_interval() {
        let pacer = SendPacer::new(ms(500));
        let t0 = Instant::now();
        pacer.apply_delay(UserId(1)).await;

        sleep(ms(100)).await;
        let wait = pacer.apply_delay(UserId(1)).await;

        assert_eq!(wait, ms(400));
        assert!(Instant::now() >= t0 + ms(500));
        assert_eq!(pacer.last_send(UserId(1)).await, Some(t0 + ms(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn no_wait_once_interval_elapsed() {
        let pacer = SendPacer::new(ms(500));
        pacer.apply_delay(UserId(1)).await;
        sleep(ms(700)).await;
        assert_eq!(pacer.apply_delay(UserId(1)).await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn senders_are_independent() {
        let pacer = SendPacer::new(ms(500));
        assert_eq!(pacer.apply_delay(UserId(1)).await, Duration::ZERO);
        assert_eq!(pacer.apply_delay(UserId(2)).await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_sends_for_one_sender_are_spaced() {
        let pacer = SendPacer::new(ms(500));
        let (a, b, c) = tokio::join!(
            pacer.apply_delay(UserId(7)),
            pacer.apply_delay(UserId(7)),
            pacer.apply_delay(UserId(7)),
        );
        let mut waits = vec![a, b, c];
        waits.sort();
        assert_eq!(waits, vec![Duration::ZERO, ms(500), ms(1000)]);
    }

    #[test]
    fn reserved_timestamp_never_moves_backward() {
        let mut map = HashMap::new();
        let now = Instant::now();
        let u = UserId(3);

        reserve(&mut map, u, ms(500), now + ms(800));
        let first = map[&u];
        // A caller that sampled `now` earlier must not rewind the slot.
        reserve(&mut map, u, ms(500), now);
        assert!(map[&u] >= first);
        assert_eq!(map[&u], first + ms(500));
    }
}
