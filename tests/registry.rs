mod tests {
    use std::sync::Arc;
    use std::thread;

    use dmx_composer::{Effect, EffectRegistry, Instant, QueueId, Target};

    fn set_effect(queue: u128, channel: u16, value: u8) -> Arc<Effect> {
        let target = Target::new(QueueId::from_raw(queue), channel, 1);
        let mut effect = Effect::set(target, value).unwrap();
        effect.start(Instant::from_millis(0));
        Arc::new(effect)
    }

    #[test]
    fn test_insert_keeps_order() {
        let registry: EffectRegistry<8> = EffectRegistry::new();
        for value in 0..4 {
            registry.insert(set_effect(1, 0, value)).unwrap();
        }
        let values: Vec<u8> = registry
            .snapshot()
            .iter()
            .map(|effect| effect.end_value())
            .collect();
        assert_eq!(values, [0, 1, 2, 3]);
    }

    #[test]
    fn test_insert_when_full() {
        let registry: EffectRegistry<2> = EffectRegistry::new();
        registry.insert(set_effect(1, 0, 1)).unwrap();
        registry.insert(set_effect(1, 0, 2)).unwrap();
        let rejected = registry.insert(set_effect(1, 0, 3)).unwrap_err();
        assert_eq!(rejected.end_value(), 3);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.capacity(), 2);
    }

    #[test]
    fn test_insert_all_is_all_or_nothing() {
        let registry: EffectRegistry<3> = EffectRegistry::new();
        registry.insert(set_effect(1, 0, 1)).unwrap();
        registry.insert(set_effect(1, 0, 2)).unwrap();

        let pair = [set_effect(2, 0, 3), set_effect(2, 0, 4)];
        assert!(!registry.insert_all(&pair));
        assert_eq!(registry.len(), 2);
        assert!(!registry.queue_ids().contains(QueueId::from_raw(2)));

        assert!(registry.insert_all(&pair[..1]));
        assert_eq!(registry.len(), 3);
        assert!(registry.insert_all(&[]));
    }

    #[test]
    fn test_remove_all_preserves_order() {
        let registry: EffectRegistry<8> = EffectRegistry::new();
        let effects: Vec<_> = (0..5).map(|value| set_effect(1, 0, value)).collect();
        for effect in &effects {
            registry.insert(Arc::clone(effect)).unwrap();
        }

        let removed = registry.remove_all(&[Arc::clone(&effects[1]), Arc::clone(&effects[3])]);
        assert_eq!(removed, 2);
        let values: Vec<u8> = registry
            .snapshot()
            .iter()
            .map(|effect| effect.end_value())
            .collect();
        assert_eq!(values, [0, 2, 4]);

        assert!(registry.remove(&effects[0]));
        assert!(!registry.remove(&effects[0]));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_snapshot_is_stable() {
        let registry: EffectRegistry<8> = EffectRegistry::new();
        registry.insert(set_effect(1, 0, 1)).unwrap();
        let snapshot = registry.snapshot();
        registry.insert(set_effect(1, 0, 2)).unwrap();
        registry.remove(&snapshot[0]);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_queue_ids_are_deduplicated() {
        let registry: EffectRegistry<8> = EffectRegistry::new();
        registry.insert(set_effect(1, 0, 1)).unwrap();
        registry.insert(set_effect(2, 1, 1)).unwrap();
        registry.insert(set_effect(1, 2, 1)).unwrap();

        let ids = registry.queue_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(QueueId::from_raw(1)));
        assert!(ids.contains(QueueId::from_raw(2)));
        assert!(!ids.contains(QueueId::SENTINEL));

        let empty: EffectRegistry<8> = EffectRegistry::new();
        assert!(empty.queue_ids().is_empty());
    }

    #[test]
    fn test_concurrent_insert_while_iterating() {
        const PRODUCERS: u128 = 4;
        const PER_PRODUCER: u16 = 100;

        let registry: Arc<EffectRegistry<512>> = Arc::new(EffectRegistry::new());
        let reader = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let mut max_seen = 0;
                while max_seen < 400 {
                    let snapshot = registry.snapshot();
                    for effect in &snapshot {
                        assert!(usize::from(effect.channel()) < 512);
                    }
                    max_seen = max_seen.max(snapshot.len());
                    thread::yield_now();
                }
                max_seen
            })
        };

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|queue| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for channel in 0..PER_PRODUCER {
                        registry.insert(set_effect(queue + 1, channel, 1)).unwrap();
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }
        assert_eq!(reader.join().unwrap(), 400);
        assert_eq!(registry.len(), 400);
        assert_eq!(registry.queue_ids().len(), 4);
    }
}
