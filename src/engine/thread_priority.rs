// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Environment variable holding the mix thread priority (0-99).
pub const PRIORITY_ENV: &str = "STEELPAN_THREAD_PRIORITY";

/// Environment variable that opts out of SCHED_FIFO for the mix thread.
pub const DISABLE_RT_ENV: &str = "STEELPAN_DISABLE_RT_AUDIO";

/// Default priority for the mix thread when STEELPAN_THREAD_PRIORITY is unset.
const DEFAULT_MIX_THREAD_PRIORITY: u8 = 70;

/// Reads STEELPAN_THREAD_PRIORITY once, before the mix thread starts.
pub fn mix_thread_priority() -> Option<ThreadPriorityValue> {
    let priority = std::env::var(PRIORITY_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|n| *n < 100)
        .unwrap_or(DEFAULT_MIX_THREAD_PRIORITY);
    ThreadPriorityValue::try_from(priority).ok()
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| {
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}

/// Returns whether we should attempt RT (SCHED_FIFO) scheduling for the mix thread.
pub fn rt_audio_enabled() -> bool {
    !env_flag(DISABLE_RT_ENV)
}

/// Raises the calling thread's priority. Failures are logged; the engine
/// runs at normal priority rather than not at all.
pub fn configure_mix_thread_priority(priority: Option<ThreadPriorityValue>, rt_audio: bool) {
    let Some(priority) = priority else {
        return;
    };
    let tp = ThreadPriority::Crossplatform(priority);
    if let Err(e) = set_current_thread_priority(tp) {
        warn!(error = ?e, "Failed to raise mix thread priority");
    }

    #[cfg(unix)]
    if rt_audio {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        let tid = thread_native_id();
        match set_thread_priority_and_policy(
            tid,
            tp,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => {
                info!("Enabled RT SCHED_FIFO for mix thread");
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to set RT SCHED_FIFO for mix thread"
                );
            }
        }
    }
    #[cfg(not(unix))]
    let _ = rt_audio;
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn with_env<F: FnOnce()>(name: &str, value: Option<&str>, f: F) {
        let original = std::env::var(name).ok();
        match value {
            Some(value) => std::env::set_var(name, value),
            None => std::env::remove_var(name),
        }
        f();
        match original {
            Some(val) => std::env::set_var(name, val),
            None => std::env::remove_var(name),
        }
    }

    #[test]
    #[serial]
    fn test_priority_from_env() {
        with_env(PRIORITY_ENV, Some("42"), || {
            assert_eq!(
                mix_thread_priority(),
                ThreadPriorityValue::try_from(42u8).ok()
            );
        });
        with_env(PRIORITY_ENV, Some("250"), || {
            assert_eq!(
                mix_thread_priority(),
                ThreadPriorityValue::try_from(DEFAULT_MIX_THREAD_PRIORITY).ok()
            );
        });
        with_env(PRIORITY_ENV, None, || {
            assert!(mix_thread_priority().is_some());
        });
    }

    #[test]
    #[serial]
    fn test_rt_audio_flag() {
        with_env(DISABLE_RT_ENV, Some("yes"), || assert!(!rt_audio_enabled()));
        with_env(DISABLE_RT_ENV, Some("0"), || assert!(rt_audio_enabled()));
        with_env(DISABLE_RT_ENV, None, || assert!(rt_audio_enabled()));
    }
}
