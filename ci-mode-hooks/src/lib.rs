//! Built-in mode handlers.
//!
//! Each handler is a [`ModeHook`]: the same decision runs in-process or, through
//! [`child::run_child`], inside an isolated process.

use std::sync::Arc;
use ci_mode_core::hook::registry::{HookDescriptor, HookRegistry, IsolatedCommand};
use ci_mode_core::hook::{HookPhase, ModeHook};
use crate::cache::CacheSkipHook;
use crate::definition::dry::DryRunHook;
use crate::definition::error::ErrorHook;
use crate::definition::ok::OkHook;
use crate::definition::skip::SkipHook;
use crate::definition::substitute::SubstituteHook;
use crate::definition::timeout::{TimeoutCleanupHook, TimeoutHook};

pub mod cache;
pub mod child;
pub mod definition;

// Begin phase
pub const DRY_ORDER: u32 = 10;
pub const OK_ORDER: u32 = 20;
pub const ERROR_ORDER: u32 = 30;
pub const SKIP_ORDER: u32 = 40;
pub const TIMEOUT_ORDER: u32 = 50;
pub const TEST_ORDER: u32 = 60;
pub const CACHE_ORDER: u32 = 90;

// End phase
pub const TIMEOUT_CLEANUP_ORDER: u32 = 10;

pub fn builtin_hooks() -> Vec<Arc<dyn ModeHook>> {
    vec![
        Arc::new(DryRunHook),
        Arc::new(OkHook),
        Arc::new(ErrorHook),
        Arc::new(SkipHook),
        Arc::new(TimeoutHook),
        Arc::new(SubstituteHook),
        Arc::new(CacheSkipHook),
        Arc::new(TimeoutCleanupHook),
    ]
}

pub fn find_hook(name: &str, phase: HookPhase) -> Option<Arc<dyn ModeHook>> {
    builtin_hooks()
        .into_iter()
        .find(|hook| hook.name() == name && hook.phase() == phase)
}

/// Registry running every built-in in this process.
pub fn in_process_registry() -> HookRegistry {
    let mut registry = HookRegistry::new();
    for hook in builtin_hooks() {
        registry.register_hook(hook);
    }
    registry
}

/// Registry running every built-in as `<base> hook <name> --phase <phase>`.
pub fn isolated_registry(base: &IsolatedCommand) -> HookRegistry {
    let mut registry = HookRegistry::new();
    registry.extend(isolated_descriptors(base));
    registry
}

pub fn isolated_descriptors(base: &IsolatedCommand) -> Vec<HookDescriptor> {
    builtin_hooks()
        .iter()
        .map(|hook| {
            let command = base
                .clone()
                .arg("hook")
                .arg(hook.name())
                .arg("--phase")
                .arg(hook.phase().to_string());
            HookDescriptor::isolated(hook.name(), hook.phase(), hook.order(), command)
        })
        .collect()
}
