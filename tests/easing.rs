mod tests {
    use dmx_composer::{Easing, EasingExtents, EasingType, evaluate};

    const CURVES: [EasingType; 8] = [
        EasingType::Linear,
        EasingType::Sine,
        EasingType::Quadratic,
        EasingType::Cubic,
        EasingType::Quartic,
        EasingType::Quintic,
        EasingType::Exponential,
        EasingType::Circular,
    ];

    const EXTENTS: [EasingExtents; 4] = [
        EasingExtents::None,
        EasingExtents::EaseIn,
        EasingExtents::EaseOut,
        EasingExtents::EaseInOut,
    ];

    fn all_easings() -> impl Iterator<Item = Easing> {
        CURVES.into_iter().flat_map(|curve_in| {
            CURVES.into_iter().flat_map(move |curve_out| {
                EXTENTS
                    .into_iter()
                    .map(move |extents| Easing::new(curve_in, curve_out, extents))
            })
        })
    }

    #[test]
    fn test_endpoints_are_exact() {
        for easing in all_easings() {
            for (start, end) in [(0, 255), (255, 0), (17, 200), (90, 90)] {
                assert_eq!(evaluate(0.0, start, end, &easing), start, "{easing:?}");
                assert_eq!(evaluate(1.0, start, end, &easing), end, "{easing:?}");
            }
        }
    }

    #[test]
    fn test_out_of_range_fraction_is_clamped() {
        let easing = Easing::LINEAR;
        assert_eq!(evaluate(-0.5, 10, 20, &easing), 10);
        assert_eq!(evaluate(1.5, 10, 20, &easing), 20);
    }

    #[test]
    fn test_linear_midpoint() {
        let value = evaluate(0.5, 0, 255, &Easing::LINEAR);
        assert!(value == 127 || value == 128, "got {value}");
    }

    #[test]
    fn test_monotonic_rising() {
        for easing in all_easings() {
            let mut previous = 0;
            for step in 0..=1000 {
                let value = evaluate(step as f32 / 1000.0, 0, 255, &easing);
                assert!(value >= previous, "{easing:?} dips at step {step}");
                previous = value;
            }
        }
    }

    #[test]
    fn test_monotonic_falling() {
        for easing in all_easings() {
            let mut previous = 255;
            for step in 0..=1000 {
                let value = evaluate(step as f32 / 1000.0, 255, 0, &easing);
                assert!(value <= previous, "{easing:?} rises at step {step}");
                previous = value;
            }
        }
    }

    #[test]
    fn test_ease_in_lags_linear() {
        let eased = Easing::symmetric(EasingType::Quadratic, EasingExtents::EaseIn);
        let linear = evaluate(0.25, 0, 255, &Easing::LINEAR);
        assert!(evaluate(0.25, 0, 255, &eased) < linear);
        // Second half stays linear
        assert_eq!(
            evaluate(0.75, 0, 255, &eased),
            evaluate(0.75, 0, 255, &Easing::LINEAR)
        );
    }

    #[test]
    fn test_ease_out_leads_linear() {
        let eased = Easing::symmetric(EasingType::Cubic, EasingExtents::EaseOut);
        let linear = evaluate(0.75, 0, 255, &Easing::LINEAR);
        assert!(evaluate(0.75, 0, 255, &eased) > linear);
        assert_eq!(
            evaluate(0.25, 0, 255, &eased),
            evaluate(0.25, 0, 255, &Easing::LINEAR)
        );
    }

    #[test]
    fn test_halves_meet_in_the_middle() {
        for easing in all_easings() {
            let shaped = easing.shape(0.5);
            assert!((shaped - 0.5).abs() < 1e-6, "{easing:?} -> {shaped}");
        }
    }

    #[test]
    fn test_extents_none_ignores_curves() {
        let easing = Easing::new(EasingType::Quintic, EasingType::Circular, EasingExtents::None);
        for step in 0..=10 {
            let t = step as f32 / 10.0;
            assert_eq!(
                evaluate(t, 0, 255, &easing),
                evaluate(t, 0, 255, &Easing::LINEAR)
            );
        }
    }
}
