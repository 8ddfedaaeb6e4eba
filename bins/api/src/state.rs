//! Shared application state.

use hostnet::{
    Backend, CommandRunner, HostEnv, HostnameStore, Inventory, NetplanStore, SystemRunner,
};

/// Everything the handlers need, constructed once at startup.
///
/// Handlers are generic over the command runner so tests can swap the
/// system runner for a scripted one.
#[derive(Clone)]
pub struct AppState<R: CommandRunner + Clone> {
    pub env: HostEnv,
    pub backend: Backend<R>,
    pub hostname: HostnameStore<R>,
    pub inventory: Inventory<R>,
    pub netplan: NetplanStore,
    pub runner: R,
}

impl AppState<SystemRunner> {
    /// State over the detected host environment and the real system
    /// runner.
    pub fn detect() -> Self {
        Self::new(HostEnv::detect(), SystemRunner::default())
    }
}

impl<R: CommandRunner + Clone> AppState<R> {
    pub fn new(env: HostEnv, runner: R) -> Self {
        Self {
            backend: Backend::from_env(&env, runner.clone()),
            hostname: HostnameStore::new(runner.clone()),
            inventory: Inventory::new(runner.clone(), &env),
            netplan: NetplanStore::new(),
            env,
            runner,
        }
    }
}
