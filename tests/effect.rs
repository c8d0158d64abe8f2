mod tests {
    use dmx_composer::{
        Duration, Easing, Effect, EffectKind, EffectParams, Error, Instant, PulseMode, QueueId,
        Target,
    };

    const QUEUE: QueueId = QueueId::from_raw(7);
    const TARGET: Target = Target::new(QUEUE, 3, 5);

    fn ramp(duration_ms: u64) -> EffectParams {
        EffectParams::new(TARGET, 200, Duration::from_millis(duration_ms)).with_start(0)
    }

    #[test]
    fn test_rejects_channel_outside_bus() {
        let target = Target::new(QUEUE, 512, 1);
        assert!(matches!(
            Effect::set(target, 10),
            Err(Error::InvalidChannel(512))
        ));
        assert!(Effect::set(Target::new(QUEUE, 511, 1), 10).is_ok());
    }

    #[test]
    fn test_rejects_inverted_window() {
        let effect = Effect::transition(ramp(100)).unwrap();
        let result = effect.with_window(Instant::from_millis(50), Instant::from_millis(10));
        assert!(matches!(result, Err(Error::InvalidTimeRange)));
    }

    #[test]
    fn test_window_sets_transition_duration() {
        let effect = Effect::transition(ramp(1))
            .unwrap()
            .with_window(Instant::from_millis(100), Instant::from_millis(300))
            .unwrap();
        assert_eq!(effect.duration(), Duration::from_millis(200));
        assert_eq!(effect.current_value(Instant::from_millis(200)), Some(100));
    }

    #[test]
    fn test_start_sets_window() {
        let mut effect = Effect::transition(ramp(100)).unwrap();
        effect.start(Instant::from_millis(1_000));
        assert_eq!(effect.from_timestamp(), Instant::from_millis(1_000));
        assert_eq!(effect.to_timestamp(), Instant::from_millis(1_100));

        assert!(effect.is_pending(Instant::from_millis(999)));
        assert!(effect.is_active(Instant::from_millis(1_000)));
        assert!(effect.is_active(Instant::from_millis(1_100)));
        assert!(effect.is_expired(Instant::from_millis(1_101)));
    }

    #[test]
    fn test_start_in_future() {
        let mut effect = Effect::transition(ramp(100)).unwrap();
        effect.start_in(Instant::from_millis(1_000), 250);
        assert_eq!(effect.from_timestamp(), Instant::from_millis(1_250));
        assert_eq!(effect.to_timestamp(), Instant::from_millis(1_350));
    }

    #[test]
    fn test_start_in_negative_delay() {
        let mut effect = Effect::transition(ramp(100)).unwrap();
        effect.start_in(Instant::from_millis(1_000), -500);
        assert_eq!(effect.from_timestamp(), Instant::from_millis(500));
        assert!(effect.is_expired(Instant::from_millis(1_000)));
        assert_eq!(effect.current_value(Instant::from_millis(1_000)), Some(200));

        // Saturates at the clock origin
        effect.start_in(Instant::from_millis(10), -500);
        assert_eq!(effect.from_timestamp(), Instant::MIN);
    }

    #[test]
    fn test_set_is_instant() {
        let mut effect = Effect::set(TARGET, 42).unwrap();
        effect.start(Instant::from_millis(10));
        assert_eq!(effect.kind(), EffectKind::Set);
        assert_eq!(effect.duration(), Duration::from_ticks(0));
        assert_eq!(effect.from_timestamp(), effect.to_timestamp());
        assert_eq!(effect.current_value(Instant::from_millis(10)), Some(42));
        assert!(!effect.is_expired(Instant::from_millis(10)));
        assert!(effect.is_expired(Instant::from_millis(11)));
    }

    #[test]
    fn test_transition_values() {
        let mut effect = Effect::transition(ramp(100)).unwrap();
        effect.start(Instant::from_millis(0));
        assert_eq!(effect.current_value(Instant::from_millis(0)), Some(0));
        assert_eq!(effect.current_value(Instant::from_millis(50)), Some(100));
        assert_eq!(effect.current_value(Instant::from_millis(100)), Some(200));
        assert_eq!(effect.current_value(Instant::from_millis(5_000)), Some(200));
    }

    #[test]
    fn test_unresolved_start_has_no_value() {
        let params = EffectParams::new(TARGET, 200, Duration::from_millis(100));
        let mut effect = Effect::transition(params).unwrap();
        effect.start(Instant::from_millis(0));
        assert_eq!(effect.start_value(), None);
        assert_eq!(effect.resolved_start(), None);
        assert_eq!(effect.current_value(Instant::from_millis(50)), None);
    }

    #[test]
    fn test_stop_forces_expiry() {
        let mut effect = Effect::transition(ramp(10_000)).unwrap();
        effect.start(Instant::from_millis(0));
        assert!(!effect.is_expired(Instant::from_millis(10)));
        effect.stop();
        assert!(effect.is_stopped());
        assert!(effect.is_expired(Instant::from_millis(10)));
        assert!(!effect.is_active(Instant::from_millis(10)));
    }

    #[test]
    fn test_pulse_reflects() {
        let mut effect = Effect::pulse(ramp(100), PulseMode::Reflect).unwrap();
        effect.start(Instant::from_millis(0));
        assert_eq!(effect.to_timestamp(), Instant::MAX);

        assert_eq!(effect.current_value(Instant::from_millis(0)), Some(0));
        assert_eq!(effect.current_value(Instant::from_millis(50)), Some(100));
        assert_eq!(effect.current_value(Instant::from_millis(100)), Some(200));
        assert_eq!(effect.current_value(Instant::from_millis(150)), Some(100));
        assert_eq!(effect.current_value(Instant::from_millis(200)), Some(0));
        assert_eq!(effect.current_value(Instant::from_millis(1_050)), Some(100));
        assert!(!effect.is_expired(Instant::from_millis(1_000_000)));
    }

    #[test]
    fn test_pulse_restarts() {
        let mut effect = Effect::pulse(ramp(100), PulseMode::Restart).unwrap();
        effect.start(Instant::from_millis(0));
        assert_eq!(effect.current_value(Instant::from_millis(99)), Some(198));
        assert_eq!(effect.current_value(Instant::from_millis(100)), Some(0));
        assert_eq!(effect.current_value(Instant::from_millis(150)), Some(100));
    }

    #[test]
    fn test_pulse_window_bounds_it() {
        let effect = Effect::pulse(ramp(100), PulseMode::Reflect)
            .unwrap()
            .with_window(Instant::from_millis(0), Instant::from_millis(1_000))
            .unwrap();
        assert_eq!(effect.duration(), Duration::from_millis(100));
        assert!(effect.is_expired(Instant::from_millis(1_001)));
    }

    #[test]
    fn test_eased_transition_keeps_endpoints() {
        let params = ramp(100).with_easing(Easing::symmetric(
            dmx_composer::EasingType::Sine,
            dmx_composer::EasingExtents::EaseInOut,
        ));
        let mut effect = Effect::transition(params).unwrap();
        effect.start(Instant::from_millis(0));
        assert_eq!(effect.current_value(Instant::from_millis(0)), Some(0));
        assert_eq!(effect.current_value(Instant::from_millis(100)), Some(200));
    }
}
