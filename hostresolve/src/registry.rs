//! Primary-lookup registry & fan-out (spec section 4.4).
//!
//! Collapses concurrent forward lookups for the same name into one
//! resolver-driver call. Grounded on the "owner-per-resource model"
//! REDESIGN FLAGS note: the registry owns nothing beyond a set of waiter
//! channels per name, and never touches a `Host`'s own mutex, which
//! satisfies the lock-ordering rule (section 5) by construction rather than
//! by discipline — there is no path here that ever acquires a host mutex.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::address::Address;
use crate::engine::Engine;
use crate::error::StreamError;
use crate::host::{Host, InfoKind};

type WaiterTx = oneshot::Sender<Result<Vec<Address>, StreamError>>;

#[derive(Default)]
struct RegistryEntry {
    waiters: Vec<WaiterTx>,
}

#[derive(Default)]
pub struct Registry {
    entries: Mutex<HashMap<String, RegistryEntry>>,
}

enum Role {
    Primary,
    Waiter(oneshot::Receiver<Result<Vec<Address>, StreamError>>),
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join an in-flight forward lookup for `name`, or become its primary.
    /// At most one resolver-driver forward query per family ever issues for
    /// a given name while any caller is waiting on it (spec section 8).
    pub async fn obtain_or_join(&self, engine: &Engine, name: String) -> Result<Vec<Address>, StreamError> {
        let role = {
            let mut entries = self.entries.lock();
            if let Some(entry) = entries.get_mut(&name) {
                let (tx, rx) = oneshot::channel();
                entry.waiters.push(tx);
                Role::Waiter(rx)
            } else {
                entries.insert(name.clone(), RegistryEntry::default());
                Role::Primary
            }
        };

        match role {
            Role::Primary => {
                log::debug!("lookup {name} became primary");
                let result = Self::run_primary_host(engine, &name).await;
                self.fan_out(engine, &name, result.clone()).await;
                result
            }
            Role::Waiter(rx) => {
                log::debug!("lookup {name} joined an in-flight primary");
                rx.await.unwrap_or_else(|_| Err(StreamError::cancelled()))
            }
        }
    }

    /// Issue the primary's own query through a real, ephemeral `Host`
    /// driving an `InfoKind::PrimaryAddresses` resolution, rather than a bare
    /// driver call, so the primary goes through the same generation and
    /// cancellation bookkeeping every other caller gets (spec section 4.4
    /// step 3; grounded on the original's `_CreateMasterAddressLookup`/
    /// `_kCFHostMasterAddressLookup`). This `Host` is never shared outside
    /// this call and is dropped once the query settles.
    async fn run_primary_host(engine: &Engine, name: &str) -> Result<Vec<Address>, StreamError> {
        let host = Host::with_name(name.to_owned(), engine.clone());
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        host.set_client(Some(Arc::new(move |_h, kind, err| {
            if kind != InfoKind::PrimaryAddresses {
                return;
            }
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(err);
            }
        })));

        host.start_info_resolution(InfoKind::PrimaryAddresses)
            .expect("freshly constructed host has no in-flight lookup");

        match rx.await.unwrap_or(Some(StreamError::cancelled())) {
            Some(err) => Err(err),
            None => Ok(host
                .get_addresses()
                .expect("callback only fires after the payload slot is set")
                .expect("success callback implies an Ok payload")),
        }
    }

    /// Publish the primary's result to every waiter and to the process-wide
    /// cache, then drop the registry entry. Every recipient — the cache and
    /// each waiter — gets its own independently cloned `Vec<Address>`; none
    /// of them share a reference to the primary's own copy (resolves the
    /// "`addrs` vs `cp`" ambiguity noted in spec section 9).
    async fn fan_out(&self, engine: &Engine, name: &str, result: Result<Vec<Address>, StreamError>) {
        let entry = self.entries.lock().remove(name);

        if let Ok(addrs) = &result {
            let mut keys: HashSet<String> = addrs.iter().filter_map(|a| a.canonical_name.clone()).collect();
            keys.insert(name.to_owned());
            for key in keys {
                engine.cache.insert(key, addrs.clone());
            }
        }

        if let Some(entry) = entry {
            log::debug!("lookup {name} fanning out to {} waiter(s)", entry.waiters.len());
            for tx in entry.waiters {
                let _ = tx.send(result.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::FakeDriver;
    use crate::engine::{Engine, EngineConfig};
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    fn engine_with_fake(driver: FakeDriver) -> Engine {
        Engine::new(Arc::new(driver), EngineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn concurrent_joins_issue_one_forward_query() {
        let driver = FakeDriver::new().with_forward(
            "dup.test.",
            vec![SocketAddr::new(Ipv4Addr::new(10, 0, 0, 1).into(), 0)],
        );
        let forward_calls = driver.forward_call_counter();
        let engine = engine_with_fake(driver);
        let a = engine.registry.obtain_or_join(&engine, "dup.test.".into());
        let b = engine.registry.obtain_or_join(&engine, "dup.test.".into());
        let (ra, rb) = tokio::join!(a, b);
        assert!(ra.is_ok());
        assert!(rb.is_ok());
        assert_eq!(ra.unwrap(), rb.unwrap());
        assert_eq!(forward_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn primary_failure_is_delivered_to_every_waiter() {
        let driver = FakeDriver::new(); // no answer configured for "missing.test."
        let engine = engine_with_fake(driver);
        let a = engine.registry.obtain_or_join(&engine, "missing.test.".into());
        let b = engine.registry.obtain_or_join(&engine, "missing.test.".into());
        let (ra, rb) = tokio::join!(a, b);
        assert!(ra.is_err());
        assert!(rb.is_err());
    }
}
