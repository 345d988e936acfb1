//! 进程内计数器
//!
//! 轻量观测：切换/验证/刷新/确认各环节的计数，供诊断与测试断言。

use std::sync::{Mutex, OnceLock};

use serde::Serialize;

static METRICS: OnceLock<Mutex<MetricsState>> = OnceLock::new();

#[derive(Default)]
struct MetricsState {
    switch_requests_total: u64,
    switch_success_total: u64,
    switch_strategy_fallback_total: u64,
    switch_failed_total: u64,
    verify_polls_total: u64,
    handle_refresh_total: u64,
    confirmation_polls_total: u64,
    confirmation_confirmed_total: u64,
    confirmation_timeout_total: u64,
}

fn state() -> &'static Mutex<MetricsState> {
    METRICS.get_or_init(|| Mutex::new(MetricsState::default()))
}

pub fn inc_switch_request() {
    state().lock().unwrap().switch_requests_total += 1;
}

pub fn inc_switch_success() {
    state().lock().unwrap().switch_success_total += 1;
}

pub fn inc_switch_strategy_fallback() {
    state().lock().unwrap().switch_strategy_fallback_total += 1;
}

pub fn inc_switch_failed() {
    state().lock().unwrap().switch_failed_total += 1;
}

pub fn inc_verify_poll() {
    state().lock().unwrap().verify_polls_total += 1;
}

pub fn inc_handle_refresh() {
    state().lock().unwrap().handle_refresh_total += 1;
}

pub fn inc_confirmation_poll() {
    state().lock().unwrap().confirmation_polls_total += 1;
}

pub fn inc_confirmation_confirmed() {
    state().lock().unwrap().confirmation_confirmed_total += 1;
}

pub fn inc_confirmation_timeout() {
    state().lock().unwrap().confirmation_timeout_total += 1;
}

/// 计数器快照
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub switch_requests_total: u64,
    pub switch_success_total: u64,
    pub switch_strategy_fallback_total: u64,
    pub switch_failed_total: u64,
    pub verify_polls_total: u64,
    pub handle_refresh_total: u64,
    pub confirmation_polls_total: u64,
    pub confirmation_confirmed_total: u64,
    pub confirmation_timeout_total: u64,
}

pub fn snapshot() -> MetricsSnapshot {
    let s = state().lock().unwrap();
    MetricsSnapshot {
        switch_requests_total: s.switch_requests_total,
        switch_success_total: s.switch_success_total,
        switch_strategy_fallback_total: s.switch_strategy_fallback_total,
        switch_failed_total: s.switch_failed_total,
        verify_polls_total: s.verify_polls_total,
        handle_refresh_total: s.handle_refresh_total,
        confirmation_polls_total: s.confirmation_polls_total,
        confirmation_confirmed_total: s.confirmation_confirmed_total,
        confirmation_timeout_total: s.confirmation_timeout_total,
    }
}
