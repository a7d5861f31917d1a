extern crate cosyne_experiments;

#[cfg(test)]
mod test {
    use cosyne_experiments::cosyne::common::Settings;
    use cosyne_experiments::cosyne::error::PersistError;
    use cosyne_experiments::cosyne::evolved_layer::EvolvedLayer;
    use cosyne_experiments::cosyne::layer::Layer;
    use cosyne_experiments::cosyne::registry::IdRegistry;
    use cosyne_experiments::cosyne::vector::RealVector;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn layer(seed: u64, input_size: usize, output_size: usize, settings: &Settings) -> EvolvedLayer {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut registry = IdRegistry::default();
        EvolvedLayer::setup(&mut rng, &mut registry, input_size, output_size, settings).unwrap()
    }

    // everything a load has to reproduce, as raw bits
    fn snapshot(layer: &EvolvedLayer) -> Vec<u64> {
        let mut bits = Vec::new();
        for vector in layer.vectors() {
            bits.extend(vector.weights().iter().map(|w| w.to_bits()));
            for slot in vector.slots() {
                bits.push(slot.id() as u64);
                bits.push(slot.active_index() as u64);
                bits.push(slot.swap_count() as u64);
                bits.push(slot.best_weight_count() as u64);
                bits.push(slot.worst_fitness_seen().to_bits());
                bits.push(slot.best_weight_mean().map_or(0, f64::to_bits));
                for candidate in slot.candidates() {
                    bits.push(candidate.weight.to_bits());
                    bits.push(candidate.fitness.to_bits());
                }
            }
        }
        bits
    }

    fn train(layer: &mut EvolvedLayer, steps: usize) {
        for step in 0..steps {
            layer.apply_reward(((step * 7) % 11) as f64 - 5.);
            layer.tick();
        }
    }

    #[test]
    fn reward_sequence_switches_with_certain_probability() {
        let settings = Settings { base_switch_probability: 1.0, ..Settings::with_populus(4) };
        let mut layer = layer(42, 2, 1, &settings);
        let input = RealVector::from(vec![1.0, 1.0]);
        for reward in [1.0, 1.0, -1.0, 1.0] {
            let _ = layer.fire(&input);
            layer.apply_reward(reward);
            layer.tick();
        }
        // the negative tick has a negative switch probability
        assert!(layer.vectors()[0].slots().iter().all(|s| s.swap_count() == 3));
    }

    #[test]
    fn reward_sequence_eventually_switches_with_default_probability() {
        let settings = Settings::with_populus(4);
        let mut layer = layer(42, 2, 1, &settings);
        let input = RealVector::from(vec![1.0, 1.0]);
        let mut switched = false;
        for _ in 0..500 {
            for reward in [1.0, 1.0, -1.0, 1.0] {
                let _ = layer.fire(&input);
                layer.apply_reward(reward);
                layer.tick();
                switched |= layer.vectors()[0].slots().iter().any(|s| s.swap_count() > 0);
            }
        }
        assert!(switched);
    }

    #[test]
    fn single_candidate_slots_never_switch() {
        let settings = Settings { base_switch_probability: 1.0, ..Settings::with_populus(1) };
        let mut layer = layer(7, 3, 2, &settings);
        let weights: Vec<_> = layer.vectors().iter().map(|v| v.weights().clone()).collect();
        for step in 0..100 {
            layer.apply_reward(if step % 2 == 0 { 1.0 } else { -1.0 });
            layer.tick();
        }
        for (vector, before) in layer.vectors().iter().zip(weights.iter()) {
            assert_eq!(vector.weights(), before);
            assert!(vector.slots().iter().all(|s| s.active_index() == 0 && s.swap_count() == 0));
        }
    }

    #[test]
    fn zero_switch_probability_keeps_active_candidates() {
        let settings = Settings { base_switch_probability: 0.0, ..Settings::with_populus(6) };
        let mut layer = layer(8, 3, 2, &settings);
        let before = layer.vectors().iter().flat_map(|v| v.slots().iter().map(|s| s.active_index())).collect::<Vec<_>>();
        train(&mut layer, 300);
        let after = layer.vectors().iter().flat_map(|v| v.slots().iter().map(|s| s.active_index())).collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    #[test]
    fn save_load_round_trip_is_bit_exact() {
        let settings = Settings { base_switch_probability: 0.3, ..Settings::with_populus(5) };
        let mut source = layer(9, 3, 4, &settings);
        train(&mut source, 500);
        let mut buf = Vec::new();
        source.save(&mut buf).unwrap();

        let mut target = layer(10, 3, 4, &settings);
        target.load(&mut buf.as_slice()).unwrap();
        assert_eq!(snapshot(&source), snapshot(&target));

        let input = RealVector::from(vec![0.7, -0.1, 2.0]);
        assert_eq!(source.fire(&input), target.fire(&input));
    }

    #[test]
    fn shape_mismatch_leaves_layer_unchanged() {
        let source = layer(11, 2, 1, &Settings::with_populus(4));
        let mut buf = Vec::new();
        source.save(&mut buf).unwrap();

        let mut target = layer(12, 2, 1, &Settings::with_populus(5));
        let before = snapshot(&target);
        let result = target.load(&mut buf.as_slice());
        assert!(matches!(result, Err(PersistError::ShapeMismatch { .. })));
        assert_eq!(before, snapshot(&target));
    }

    #[test]
    fn truncated_stream_leaves_layer_unchanged() {
        let settings = Settings::with_populus(4);
        let mut source = layer(13, 2, 2, &settings);
        train(&mut source, 50);
        let mut buf = Vec::new();
        source.save(&mut buf).unwrap();
        buf.truncate(buf.len() - 3);

        let mut target = layer(14, 2, 2, &settings);
        let before = snapshot(&target);
        let result = target.load(&mut buf.as_slice());
        assert!(matches!(result, Err(PersistError::Io(_))));
        assert_eq!(before, snapshot(&target));
    }

    #[test]
    fn out_of_range_active_index_is_rejected() {
        let settings = Settings::with_populus(4);
        let source = layer(15, 2, 1, &settings);
        let mut buf = Vec::new();
        source.save(&mut buf).unwrap();
        let last = buf.len() - 2;
        buf[last..].copy_from_slice(&9u16.to_le_bytes());

        let mut target = layer(16, 2, 1, &settings);
        let before = snapshot(&target);
        assert!(matches!(target.load(&mut buf.as_slice()), Err(PersistError::Corrupt(_))));
        assert_eq!(before, snapshot(&target));
    }
}
