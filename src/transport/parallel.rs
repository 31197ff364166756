//! RB-012: Parallelization strategies for fanning a command out over hosts.
//!
//! Configured per target with `strategy` (parallel | sequence | groups),
//! `limit` (hosts per group) and `wait` (seconds between batches).

use crate::core::error::RunbookError;
use crate::core::types::yaml_value_to_string;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::time::Duration;
use tracing::debug;

const DEFAULT_GROUP_LIMIT: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum Parallelization {
    /// All hosts at once
    Parallel,
    /// One host at a time
    Sequence { wait: Duration },
    /// `limit` hosts at a time
    Groups { limit: usize, wait: Duration },
}

impl Parallelization {
    /// Parse a target's parallelization mapping. An empty mapping is `Parallel`.
    pub fn from_config(config: &IndexMap<String, serde_yaml_ng::Value>) -> Result<Self, String> {
        for key in config.keys() {
            if !matches!(key.as_str(), "strategy" | "limit" | "wait") {
                return Err(format!("unknown parallelization key '{}'", key));
            }
        }
        let wait = match config.get("wait") {
            Some(v) => {
                let secs = v.as_f64().ok_or_else(|| {
                    format!(
                        "parallelization wait must be a number, got {}",
                        yaml_value_to_string(v)
                    )
                })?;
                Duration::try_from_secs_f64(secs)
                    .map_err(|e| format!("invalid parallelization wait {}: {}", secs, e))?
            }
            None => Duration::ZERO,
        };
        let strategy = config
            .get("strategy")
            .map(yaml_value_to_string)
            .unwrap_or_else(|| "parallel".to_string());
        match strategy.as_str() {
            "parallel" => Ok(Self::Parallel),
            "sequence" => Ok(Self::Sequence { wait }),
            "groups" => {
                let limit = match config.get("limit") {
                    Some(v) => match v.as_u64() {
                        Some(n) if n > 0 => n as usize,
                        _ => return Err("parallelization limit must be a positive integer".to_string()),
                    },
                    None => DEFAULT_GROUP_LIMIT,
                };
                Ok(Self::Groups { limit, wait })
            }
            other => Err(format!("unknown parallelization strategy '{}'", other)),
        }
    }

    /// Run `f` for every host, returning results in host order.
    /// The first error (in host order) is returned once its batch finishes;
    /// later batches are not started.
    pub fn execute<H, T, F>(&self, hosts: &[H], f: F) -> Result<Vec<(H, T)>, RunbookError>
    where
        H: Clone + Sync,
        T: Send,
        F: Fn(&H) -> Result<T, RunbookError> + Sync,
    {
        let (batch_size, wait) = match self {
            Self::Parallel => (hosts.len().max(1), Duration::ZERO),
            Self::Sequence { wait } => (1, *wait),
            Self::Groups { limit, wait } => ((*limit).max(1), *wait),
        };
        let pool = if batch_size > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(batch_size)
                    .build()
                    .map_err(|e| RunbookError::WorkerPool(e.to_string()))?,
            )
        } else {
            None
        };

        let mut results = Vec::with_capacity(hosts.len());
        for (i, batch) in hosts.chunks(batch_size).enumerate() {
            if i > 0 && !wait.is_zero() {
                debug!(batch = i, ?wait, "waiting before next batch");
                std::thread::sleep(wait);
            }
            let outcomes: Vec<Result<T, RunbookError>> = match pool {
                Some(ref pool) => pool.install(|| batch.par_iter().map(&f).collect()),
                None => batch.iter().map(&f).collect(),
            };
            for (host, outcome) in batch.iter().zip(outcomes) {
                results.push((host.clone(), outcome?));
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    /// Run `strategy` over `hosts` and report the most calls ever in flight.
    fn max_in_flight(strategy: &Parallelization, hosts: &[&str]) -> usize {
        let current = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        strategy
            .execute(hosts, |_| {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                current.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        peak.load(Ordering::SeqCst)
    }

    fn config(yaml: &str) -> IndexMap<String, serde_yaml_ng::Value> {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn test_rb012_default_is_parallel() {
        assert_eq!(
            Parallelization::from_config(&IndexMap::new()).unwrap(),
            Parallelization::Parallel
        );
    }

    #[test]
    fn test_rb012_parse_groups() {
        let p = Parallelization::from_config(&config("{strategy: groups, limit: 3, wait: 0.5}")).unwrap();
        assert_eq!(
            p,
            Parallelization::Groups {
                limit: 3,
                wait: Duration::from_millis(500)
            }
        );
    }

    #[test]
    fn test_rb012_parse_groups_default_limit() {
        let p = Parallelization::from_config(&config("{strategy: groups}")).unwrap();
        assert_eq!(
            p,
            Parallelization::Groups {
                limit: DEFAULT_GROUP_LIMIT,
                wait: Duration::ZERO
            }
        );
    }

    #[test]
    fn test_rb012_parse_errors() {
        assert!(Parallelization::from_config(&config("{strategy: random}")).is_err());
        assert!(Parallelization::from_config(&config("{strategy: groups, limit: 0}")).is_err());
        assert!(Parallelization::from_config(&config("{strategy: sequence, wait: soon}")).is_err());
        assert!(Parallelization::from_config(&config("{in: parallel}")).is_err());
    }

    #[test]
    fn test_rb012_results_in_host_order() {
        let hosts = vec!["a", "b", "c", "d", "e"];
        for strategy in [
            Parallelization::Parallel,
            Parallelization::Sequence { wait: Duration::ZERO },
            Parallelization::Groups { limit: 2, wait: Duration::ZERO },
        ] {
            let out = strategy.execute(&hosts, |h| Ok(h.to_uppercase())).unwrap();
            let names: Vec<_> = out.iter().map(|(_, v)| v.as_str()).collect();
            assert_eq!(names, vec!["A", "B", "C", "D", "E"]);
        }
    }

    #[test]
    fn test_rb012_sequence_stops_at_first_error() {
        let hosts = vec!["a", "b", "c"];
        let seen = Mutex::new(Vec::new());
        let err = Parallelization::Sequence { wait: Duration::ZERO }
            .execute(&hosts, |h| {
                seen.lock().unwrap().push(h.to_string());
                if *h == "b" {
                    Err(RunbookError::Transport {
                        host: h.to_string(),
                        detail: "unreachable".to_string(),
                    })
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert!(matches!(err, RunbookError::Transport { ref host, .. } if host == "b"));
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_rb012_empty_hosts() {
        let hosts: Vec<&str> = vec![];
        let out = Parallelization::Parallel.execute(&hosts, |_| Ok(())).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_rb012_groups_respect_limit() {
        let hosts = ["a", "b", "c", "d", "e", "f"];
        let groups = Parallelization::Groups {
            limit: 2,
            wait: Duration::ZERO,
        };
        let peak = max_in_flight(&groups, &hosts);
        assert!((1..=2).contains(&peak), "peak {}", peak);

        let sequence = Parallelization::Sequence { wait: Duration::ZERO };
        assert_eq!(max_in_flight(&sequence, &hosts), 1);
    }

    #[test]
    fn test_rb012_wait_only_between_batches() {
        let wait = Duration::from_millis(50);
        let hosts = ["a", "b", "c"];
        let start = Instant::now();
        let calls = Mutex::new(Vec::new());
        Parallelization::Sequence { wait }
            .execute(&hosts, |_| {
                calls.lock().unwrap().push(start.elapsed());
                Ok(())
            })
            .unwrap();
        let calls = calls.into_inner().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls[0] < wait, "first call waited {:?}", calls[0]);
        assert!(calls[2] >= wait * 2, "third call at {:?}", calls[2]);

        // Four hosts in groups of two: one wait between the two batches.
        let start = Instant::now();
        Parallelization::Groups { limit: 2, wait }
            .execute(&["a", "b", "c", "d"], |_| Ok(()))
            .unwrap();
        assert!(start.elapsed() >= wait);
    }

    #[test]
    fn test_rb012_groups_skip_batches_after_error() {
        let hosts = ["a", "b", "c", "d"];
        let seen = AtomicUsize::new(0);
        let err = Parallelization::Groups {
            limit: 2,
            wait: Duration::ZERO,
        }
        .execute(&hosts, |h| {
            seen.fetch_add(1, Ordering::SeqCst);
            if *h == "a" {
                Err(RunbookError::Transport {
                    host: h.to_string(),
                    detail: "unreachable".to_string(),
                })
            } else {
                Ok(())
            }
        })
        .unwrap_err();
        assert!(matches!(err, RunbookError::Transport { ref host, .. } if host == "a"));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
