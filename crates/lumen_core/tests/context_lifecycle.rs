//! Integration tests for format negotiation + context lifecycle
//!
//! These tests verify that:
//! - Contexts report what the chosen format provides, not what was asked
//! - The antialiasing ladder degrades gracefully and stops at zero
//! - Activation is idempotent and strictly per thread
//! - A thread has one current context across all displays
//! - Teardown unbinds before destroying and shares are wired at creation
//! - Failed construction leaves a disabled but harmless context

use lumen_core::headless::{rgba_format, HeadlessPlatform, NativeCall};
use lumen_core::{ContextError, ContextSettings, GlDisplay, RenderingContext, SurfaceFormat};
use std::sync::Arc;
use std::thread;

const SCREEN: SurfaceFormat = SurfaceFormat::new(24, 0x21);

fn display_with(formats: Vec<lumen_core::CandidateFormat>) -> (Arc<HeadlessPlatform>, GlDisplay) {
    let platform = Arc::new(HeadlessPlatform::new(SCREEN, 24).with_formats(formats));
    let display = GlDisplay::new(platform.clone());
    (platform, display)
}

/// Scenario: 24/8 with 4x requested, but only a non-multisampled 24/8 format
/// and a 16/0 format whose 4 samples come without sample buffers
#[test]
fn test_antialiasing_falls_back_to_zero() {
    let mut no_sample_buffers = rgba_format(SCREEN, 32, 16, 0, 0);
    no_sample_buffers.sample_count = 4;
    let (platform, display) =
        display_with(vec![rgba_format(SCREEN, 32, 24, 8, 0), no_sample_buffers]);
    let window = platform.add_window(SCREEN);

    let requested = ContextSettings::new(24, 8, 4);
    let context = RenderingContext::try_new_windowed(&display, None, window, 32, requested)
        .expect("context should be created with antialiasing disabled");

    assert_eq!(*context.settings(), ContextSettings::new(24, 8, 0));
}

/// Scenario: the screen offers nothing at all
#[test]
fn test_empty_enumeration_disables_context() {
    let (platform, display) = display_with(Vec::new());
    let window = platform.add_window(SCREEN);

    let err = RenderingContext::try_new_windowed(
        &display,
        None,
        window,
        32,
        ContextSettings::default(),
    )
        .expect_err("creation must fail without formats");
    assert!(matches!(err, ContextError::Enumeration(_)));

    let context =
        RenderingContext::new_windowed(&display, None, window, 32, ContextSettings::default());
    assert!(!context.is_enabled());
    assert!(matches!(context.creation_error(), Some(ContextError::Enumeration(_))));

    platform.clear_calls();
    assert!(matches!(context.set_active(true), Err(ContextError::Activation(_))));
    assert!(context.set_active(false).is_ok());
    context.display();
    context.set_vertical_sync(true);
    drop(context);

    assert!(platform.calls().is_empty(), "a disabled context must not reach the driver");
    assert!(!display.is_any_context_active());
}

#[test]
fn test_failing_query_is_enumeration_failure() {
    let (platform, display) = display_with(vec![rgba_format(SCREEN, 32, 24, 8, 0)]);
    platform.fail_enumeration(true);

    let err = RenderingContext::try_new_offscreen(&display, None)
        .expect_err("query failure must surface");
    assert!(matches!(err, ContextError::Enumeration(_)));
    assert_eq!(platform.live_hidden_surfaces(), 0);
}

#[test]
fn test_ladder_exhaustion_reports_every_level() {
    let mut single_buffered = rgba_format(SCREEN, 32, 24, 8, 8);
    single_buffered.double_buffered = false;
    let (platform, display) = display_with(vec![single_buffered]);
    let window = platform.add_window(SCREEN);

    let requested = ContextSettings::new(24, 8, 8);
    let err = RenderingContext::try_new_windowed(&display, None, window, 32, requested)
        .expect_err("no double-buffered format exists");
    assert_eq!(err, ContextError::NoSuitableFormat { attempted: vec![8, 2, 0] });
    assert_eq!(platform.live_contexts(), 0);
}

#[test]
fn test_achieved_settings_follow_chosen_format() {
    let requests = [
        ContextSettings::new(0, 0, 0),
        ContextSettings::new(24, 8, 0),
        ContextSettings::new(32, 32, 2),
    ];
    let (platform, display) = display_with(vec![rgba_format(SCREEN, 32, 16, 1, 2)]);
    let window = platform.add_window(SCREEN);

    for request in requests {
        let context = RenderingContext::new_windowed(&display, None, window, 32, request);
        assert_eq!(context.settings().depth_bits, 16);
        assert_eq!(context.settings().stencil_bits, 1);
    }
}

#[test]
fn test_double_activation_binds_once() {
    let (platform, display) = display_with(vec![rgba_format(SCREEN, 32, 24, 8, 0)]);
    let window = platform.add_window(SCREEN);
    let context =
        RenderingContext::new_windowed(&display, None, window, 32, ContextSettings::default());

    assert!(context.set_active(true).is_ok());
    assert!(context.set_active(true).is_ok());
    assert_eq!(platform.count_calls(|call| matches!(call, NativeCall::MakeCurrent { .. })), 1);
    assert_eq!(platform.current_context(), context.native_handle());
}

#[test]
fn test_deactivating_inactive_context_is_noop() {
    let (platform, display) = display_with(vec![rgba_format(SCREEN, 32, 24, 8, 0)]);
    let first = RenderingContext::new_offscreen(&display, None);
    let second = RenderingContext::new_offscreen(&display, None);

    first.set_active(true).unwrap();
    assert!(second.set_active(false).is_ok());
    assert_eq!(platform.count_calls(|call| matches!(call, NativeCall::ReleaseCurrent)), 0);
    assert!(first.is_active());
}

#[test]
fn test_drop_deactivates_before_destroying() {
    let (platform, display) = display_with(vec![rgba_format(SCREEN, 32, 24, 8, 0)]);
    let context = RenderingContext::new_offscreen(&display, None);
    let handle = context.native_handle().expect("context should be enabled");

    context.set_active(true).unwrap();
    assert!(display.is_any_context_active());
    platform.clear_calls();

    drop(context);

    let calls = platform.calls();
    let released = calls.iter().position(|call| *call == NativeCall::ReleaseCurrent);
    let destroyed = calls.iter().position(|call| *call == NativeCall::DestroyContext(handle));
    assert!(released.is_some() && destroyed.is_some());
    assert!(released < destroyed, "context must be released before it is destroyed");

    assert!(!display.is_any_context_active());
    assert_eq!(platform.current_context(), None);
    assert_eq!(platform.destroyed_while_current(), 0);
}

#[test]
fn test_shared_contexts_reference_the_same_peer() {
    let (platform, display) = display_with(vec![rgba_format(SCREEN, 32, 24, 8, 0)]);
    let peer = RenderingContext::new_offscreen(&display, None);
    let peer_handle = peer.native_handle();

    let first = RenderingContext::new_offscreen(&display, Some(&peer));
    let second = RenderingContext::new_offscreen(&display, Some(&peer));
    assert!(first.is_enabled() && second.is_enabled());

    let shares: Vec<_> = platform
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            NativeCall::CreateContext { share_with, .. } => Some(share_with),
            _ => None,
        })
        .collect();
    assert_eq!(shares, vec![None, peer_handle, peer_handle]);

    // The peer can go away first; sharing was only consulted at creation
    drop(peer);
    assert!(second.set_active(true).is_ok());
}

#[test]
fn test_shared_creation_activates_new_context() {
    let (_platform, display) = display_with(vec![rgba_format(SCREEN, 32, 24, 8, 0)]);
    let peer = RenderingContext::new_offscreen(&display, None);
    let first = RenderingContext::new_offscreen(&display, Some(&peer));
    assert!(first.is_active());

    // A later shared context supersedes the first on this thread
    let second = RenderingContext::new_offscreen(&display, Some(&peer));
    assert!(second.is_active());
    assert!(!first.is_active());
}

#[test]
fn test_activation_is_per_thread() {
    let (platform, display) = display_with(vec![rgba_format(SCREEN, 32, 24, 8, 0)]);
    let window = platform.add_window(SCREEN);
    let context =
        RenderingContext::new_windowed(&display, None, window, 32, ContextSettings::default());
    context.set_active(true).unwrap();

    thread::scope(|scope| {
        scope.spawn(|| {
            assert!(!display.is_any_context_active());
            assert!(!context.is_active());
            // Still current on the main thread, so the driver refuses
            assert!(matches!(context.set_active(true), Err(ContextError::Activation(_))));
        });
    });

    context.set_active(false).unwrap();

    thread::scope(|scope| {
        scope.spawn(|| {
            assert!(context.set_active(true).is_ok());
            assert!(display.is_any_context_active());
            assert!(context.set_active(false).is_ok());
        });
    });
}

#[test]
fn test_current_context_is_shared_across_displays() {
    let platform = Arc::new(HeadlessPlatform::new(SCREEN, 24));
    let first_display = GlDisplay::new(platform.clone());
    let second_display = GlDisplay::new(platform.clone());
    let first = RenderingContext::new_offscreen(&first_display, None);
    let second = RenderingContext::new_offscreen(&second_display, None);

    first.set_active(true).unwrap();
    second.set_active(true).unwrap();
    assert!(!first.is_active(), "binding the second display supersedes the first");
    assert!(first_display.is_any_context_active());

    first.set_active(true).unwrap();
    assert_eq!(platform.current_context(), first.native_handle());
    assert!(!second.is_active());

    drop(first);
    assert_eq!(platform.current_context(), None);
    assert!(!second_display.is_any_context_active());

    second.set_active(true).unwrap();
    assert_eq!(platform.current_context(), second.native_handle());
}

#[test]
fn test_display_presents_only_real_surfaces() {
    let (platform, display) = display_with(vec![rgba_format(SCREEN, 32, 24, 8, 0)]);
    let window = platform.add_window(SCREEN);
    let windowed =
        RenderingContext::new_windowed(&display, None, window, 32, ContextSettings::default());
    let offscreen = RenderingContext::new_offscreen(&display, None);
    platform.clear_calls();

    windowed.display();
    offscreen.display();

    assert_eq!(platform.calls(), vec![NativeCall::SwapBuffers(window)]);
}

#[test]
fn test_vertical_sync_is_best_effort() {
    let platform = Arc::new(HeadlessPlatform::new(SCREEN, 24).without_swap_control());
    let display = GlDisplay::new(platform.clone());
    let context = RenderingContext::new_offscreen(&display, None);

    context.set_vertical_sync(true);
    assert_eq!(platform.swap_interval(), None);

    let (platform, display) = display_with(vec![rgba_format(SCREEN, 32, 24, 8, 0)]);
    let context = RenderingContext::new_offscreen(&display, None);
    context.set_vertical_sync(true);
    assert_eq!(platform.swap_interval(), Some(1));
    context.set_vertical_sync(false);
    assert_eq!(platform.swap_interval(), Some(0));
}
