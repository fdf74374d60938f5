//! Shopping list demo.
//!
//! A keyed product list with a selection cursor plus two independent
//! counters, drawn inline in the terminal.
//!
//! Keys: ↑/↓ select, a add, d delete, r reverse, 1/2 click a counter, q quit.
//!
//! Run with: cargo run --example shopping_list 2>fiber.log

use std::error::Error;
use std::io::{self, Stdout};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;
use spark_signals::effect;
use tracing::Level;

use spark_fiber::host::terminal::TerminalRenderer;
use spark_fiber::host::HostTree;
use spark_fiber::{component, each, h, text, Element, InstanceTree, NodeId, NodeKind, Runtime, Scope};

const FRUIT: &[&str] = &["Cabbage", "Garlic", "Apple", "Pear", "Kale", "Leek", "Plum"];

#[derive(Debug, Clone, PartialEq)]
struct Product {
    id: u32,
    title: &'static str,
}

// =============================================================================
// COMPONENTS
// =============================================================================

fn product_row(_cx: &mut Scope<'_>, props: &(Product, bool)) -> Element {
    let (product, selected) = props;
    h("li")
        .attr("selected", *selected)
        .child(text(format!("{} #{}", product.title, product.id)))
        .into()
}

fn shopping_list(cx: &mut Scope<'_>, _props: &()) -> Element {
    let initial: Vec<Product> = FRUIT[..3]
        .iter()
        .zip(1..)
        .map(|(title, id)| Product { id, title: *title })
        .collect();
    let (products, set_products) = cx.use_state(initial);
    let (cursor, set_cursor) = cx.use_state(0usize);
    let (next_id, set_next_id) = cx.use_state(4u32);

    let last = products.len().saturating_sub(1);
    let cursor = cursor.min(last);
    let selected_id = products.get(cursor).map(|p| p.id);

    let up = set_cursor.clone();
    let down = set_cursor.clone();
    let add = set_products.clone();
    let delete = set_products.clone();

    h("div")
        .on("up", move || up.update(|c| c.saturating_sub(1)))
        .on("down", move || down.update(move |c| (c + 1).min(last)))
        .on("add", move || {
            let title = FRUIT[next_id as usize % FRUIT.len()];
            add.update(move |list| {
                let mut list = list.clone();
                list.insert((cursor + 1).min(list.len()), Product { id: next_id, title });
                list
            });
            set_next_id.update(|n| n + 1);
        })
        .on("delete", move || {
            delete.update(move |list| {
                let mut list = list.clone();
                if cursor < list.len() {
                    list.remove(cursor);
                }
                list
            })
        })
        .on("reverse", move || {
            set_products.update(|list| list.iter().rev().cloned().collect())
        })
        .child(h("h1").child("Shopping List"))
        .child(h("ul").list(each(&products, |p| p.id, |p| {
            component(product_row, (p.clone(), Some(p.id) == selected_id))
        })))
        .into()
}

fn counter(cx: &mut Scope<'_>, name: &&'static str) -> Element {
    let (count, set_count) = cx.use_state(0);
    h("button")
        .on("click", move || set_count.update(|c| c + 1))
        .child(format!("{name}: clicked {count} times"))
        .into()
}

fn app() -> Element {
    h("div")
        .child(component(shopping_list, ()))
        .child(
            h("p")
                .child(component(counter, "one"))
                .child(" ")
                .child(component(counter, "two")),
        )
        .child(h("p").attr("dim", true).child("↑/↓ select  a add  d delete  r reverse  1/2 count  q quit"))
        .into()
}

// =============================================================================
// EVENT LOOP
// =============================================================================

/// Host nodes that handle `event`, in tree order.
fn targets(tree: &InstanceTree, event: &str) -> Vec<NodeId> {
    tree.find_all(|node| match node.kind() {
        NodeKind::Host { handlers, .. } => handlers.contains_key(event),
        _ => false,
    })
}

fn run(
    runtime: &mut Runtime,
    host: &mut HostTree,
    renderer: &mut TerminalRenderer,
    stdout: &mut Stdout,
) -> Result<(), Box<dyn Error>> {
    loop {
        renderer.render(host, stdout)?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let (event, nth) = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Up => ("up", 0),
            KeyCode::Down => ("down", 0),
            KeyCode::Char('a') => ("add", 0),
            KeyCode::Char('d') => ("delete", 0),
            KeyCode::Char('r') => ("reverse", 0),
            KeyCode::Char('1') => ("click", 0),
            KeyCode::Char('2') => ("click", 1),
            _ => continue,
        };
        let Some(node) = targets(runtime.tree(), event).get(nth).copied() else {
            continue;
        };

        if let Some(flush) = runtime.dispatch_event(node, event)? {
            for err in &flush.errors {
                tracing::error!(%err, "flush error");
            }
            tracing::debug!(patch = %flush.patch, "applied");
            host.apply(&flush.patch)?;
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_writer(io::stderr)
        .init();

    let mut runtime = Runtime::new();
    let mut host = HostTree::new(runtime.container());
    let mut renderer = TerminalRenderer::new();
    let mut stdout = io::stdout();

    let pending = runtime.pending_updates();
    let _stop = effect(move || {
        let queued = pending.get();
        if queued > 0 {
            tracing::debug!(queued, "updates waiting for flush");
        }
    });

    let flush = runtime.mount(app())?;
    host.apply(&flush.patch)?;

    terminal::enable_raw_mode()?;
    let result = run(&mut runtime, &mut host, &mut renderer, &mut stdout);
    terminal::disable_raw_mode()?;
    result
}
