use super::*;
use crate::display::dispatch::LayerStrategy;
use crate::effect::Effect;
use crate::engine::context::EngineContext;
use crate::foundation::error::GefxResult;
use crate::ge::op::Surface;

struct Nop;

impl Effect for Nop {
    fn init(&mut self, _ctx: &mut EngineContext) -> GefxResult<()> {
        Ok(())
    }

    fn draw(&mut self, _ctx: &mut EngineContext, _target: Surface) -> GefxResult<()> {
        Ok(())
    }

    fn deinit(&mut self, _ctx: &mut EngineContext) {}
}

fn nop() -> Box<dyn Effect> {
    Box::new(Nop)
}

fn sample() -> Registry {
    Registry::new(vec![
        EffectDescriptor::new("NO.1 ALPHA", nop),
        EffectDescriptor::new("NO.2 BETA", nop).isolated(),
        EffectDescriptor::new("NO.3 GAMMA", nop),
    ])
}

#[test]
fn get_is_stable_inside_range_and_none_outside() {
    let reg = sample();
    assert_eq!(reg.count(), 3);
    for i in 0..reg.count() {
        let a = reg.get(i).map(|d| d.name);
        let b = reg.get(i).map(|d| d.name);
        assert!(a.is_some());
        assert_eq!(a, b);
    }
    assert!(reg.get(3).is_none());
    assert!(reg.get(usize::MAX).is_none());
}

#[test]
fn strategy_defaults_to_traditional() {
    let reg = sample();
    assert_eq!(reg.get(0).unwrap().strategy, LayerStrategy::Traditional);
    assert_eq!(reg.get(1).unwrap().strategy, LayerStrategy::Isolated);
}

#[test]
fn find_matches_exact_then_substring() {
    let reg = sample();
    assert_eq!(reg.find("no.2 beta"), Some(1));
    assert_eq!(reg.find("gamma"), Some(2));
    assert_eq!(reg.find("delta"), None);
    assert_eq!(reg.names(), vec!["NO.1 ALPHA", "NO.2 BETA", "NO.3 GAMMA"]);
}

#[test]
fn empty_registry_has_nothing() {
    let reg = Registry::default();
    assert!(reg.is_empty());
    assert!(reg.get(0).is_none());
    assert_eq!(reg.iter().count(), 0);
}

#[test]
fn builtin_names_are_unique() {
    let reg = Registry::builtin();
    assert!(reg.count() >= 6);
    let mut names = reg.names();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), reg.count());
    assert!(
        reg.iter()
            .any(|d| d.strategy == LayerStrategy::Isolated)
    );
}
