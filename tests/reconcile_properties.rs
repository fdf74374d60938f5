//! Property tests for keyed reconciliation.
//!
//! Every flush's patch, applied to a HostTree that saw all previous
//! patches, must reproduce the instance tree.
//!
//! Run with: cargo test --test reconcile_properties

use proptest::prelude::*;

use spark_fiber::host::HostTree;
use spark_fiber::{component, h, text, Element, HostElement, NodeId, OpKind, Runtime, Scope};

fn keyed_list() -> impl Strategy<Value = Vec<i64>> {
    proptest::sample::subsequence((0..16).collect::<Vec<i64>>(), 0..=16).prop_shuffle()
}

fn host_list(keys: &[i64], highlight: i64) -> HostElement {
    h("ul").list(keys.iter().map(|key| {
        h("li")
            .key(*key)
            .attr("selected", *key == highlight)
            .child(text(format!("item {key}")))
    }))
}

fn row(cx: &mut Scope<'_>, key: &i64) -> Element {
    let (seen, _) = cx.use_state(*key);
    h("li").child(format!("{key}/{seen}")).into()
}

fn component_list(keys: &[i64]) -> HostElement {
    h("ul").list(keys.iter().map(|key| component(row, *key).key(*key)))
}

fn apply(runtime: &Runtime, host: &mut HostTree, flush: &spark_fiber::Flush) -> Result<(), TestCaseError> {
    host.apply(&flush.patch)
        .map_err(|err| TestCaseError::fail(format!("{err} in {}", flush.patch)))?;
    prop_assert_eq!(host.outline(), runtime.tree().outline());
    Ok(())
}

fn item_ids(runtime: &Runtime) -> Vec<NodeId> {
    let ul = runtime.tree().children(runtime.container())[0];
    runtime.tree().children(ul).to_vec()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn patch_reproduces_tree(
        steps in prop::collection::vec((keyed_list(), 0i64..16), 1..6)
    ) {
        let mut runtime = Runtime::new();
        let mut host = HostTree::new(runtime.container());

        for (keys, highlight) in &steps {
            let flush = runtime.render(host_list(keys, *highlight)).unwrap();
            prop_assert!(flush.is_clean());
            apply(&runtime, &mut host, &flush)?;

            let expected: String = keys
                .iter()
                .map(|key| {
                    if *key == *highlight {
                        format!("<li selected=\"true\">item {key}</li>")
                    } else {
                        format!("<li selected=\"false\">item {key}</li>")
                    }
                })
                .collect();
            prop_assert_eq!(host.to_markup(), format!("<ul>{expected}</ul>"));
        }
    }

    #[test]
    fn permutation_only_moves(
        (old, new) in keyed_list().prop_flat_map(|keys| (Just(keys.clone()), Just(keys).prop_shuffle()))
    ) {
        let mut runtime = Runtime::new();
        let mut host = HostTree::new(runtime.container());
        let flush = runtime.render(component_list(&old)).unwrap();
        apply(&runtime, &mut host, &flush)?;
        let mut before = item_ids(&runtime);

        let flush = runtime.render(component_list(&new)).unwrap();
        apply(&runtime, &mut host, &flush)?;

        prop_assert_eq!(flush.patch.count(OpKind::Create), 0);
        prop_assert_eq!(flush.patch.count(OpKind::Delete), 0);
        prop_assert_eq!(flush.patch.count(OpKind::Update), 0);
        prop_assert!(flush.patch.len() < old.len().max(1));

        let mut after = item_ids(&runtime);
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn surviving_keys_keep_instances(old in keyed_list(), new in keyed_list()) {
        let mut runtime = Runtime::new();
        let mut host = HostTree::new(runtime.container());
        let flush = runtime.render(component_list(&old)).unwrap();
        apply(&runtime, &mut host, &flush)?;
        let before: Vec<(i64, NodeId)> = old.iter().copied().zip(item_ids(&runtime)).collect();

        let flush = runtime.render(component_list(&new)).unwrap();
        apply(&runtime, &mut host, &flush)?;
        let after: Vec<(i64, NodeId)> = new.iter().copied().zip(item_ids(&runtime)).collect();

        for (key, id) in &after {
            if let Some((_, old_id)) = before.iter().find(|(old_key, _)| old_key == key) {
                prop_assert_eq!(id, old_id);
                prop_assert_eq!(runtime.state::<i64>(*id, 0), Some(*key));
            }
        }
        prop_assert_eq!(
            flush.patch.count(OpKind::Delete),
            old.iter().filter(|key| !new.contains(key)).count()
        );
    }

    #[test]
    fn identical_render_is_empty(keys in keyed_list(), highlight in 0i64..16) {
        let mut runtime = Runtime::new();
        runtime.render(host_list(&keys, highlight)).unwrap();
        runtime.render(component_list(&keys)).unwrap();

        let flush = runtime.render(component_list(&keys)).unwrap();
        prop_assert!(flush.patch.is_empty(), "got {}", flush.patch);
    }
}
