//! Headless demo: a stopwatch program driven by a timer subscription, with simulated clicks
//! going through the executor's listeners the way a browser host would send them.

use dom_store::DomStore;
use mimalloc::MiMalloc;
use runtime::{Command, NoEffects, Program, Runtime, RuntimeConfig, Subscription, Url};
use std::convert::Infallible;
use std::error::Error;
use std::time::{Duration, Instant};
use vdom::{Document, Node, PatchNode};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const TICK: Duration = Duration::from_millis(20);
const RUN_FOR: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
enum Msg {
    Tick,
    Lap,
    Toggle,
}

#[derive(Clone, Debug, Default)]
struct Model {
    ticks: u32,
    laps: Vec<u32>,
    running: bool,
}

struct Stopwatch;

impl Program for Stopwatch {
    type Model = Model;
    type Message = Msg;
    type Effect = Infallible;
    type Flags = ();

    fn init(&self, _url: &Url, _flags: ()) -> (Model, Command<Msg, Infallible>) {
        let model = Model {
            running: true,
            ..Model::default()
        };
        (model, Command::none())
    }

    fn update(&self, message: Msg, model: &Model) -> (Model, Command<Msg, Infallible>) {
        let mut next = model.clone();
        match message {
            Msg::Tick => next.ticks += 1,
            Msg::Lap => next.laps.insert(0, next.ticks),
            Msg::Toggle => next.running = !next.running,
        }
        (next, Command::none())
    }

    fn view(&self, model: &Model) -> Document<Msg> {
        let laps = model.laps.iter().enumerate().map(|(i, at)| {
            let n = model.laps.len() - i;
            Node::element("li")
                .with_key(format!("lap-{n}"))
                .child(Node::text(format!("lap {n} at {at}")))
        });
        let body = Node::element("main")
            .child(Node::element("h1").child(Node::text(format!("{} ticks", model.ticks))))
            .child(Node::element("button").attr("name", "lap").on("click", Msg::Lap))
            .child(
                Node::element("button")
                    .attr("name", "toggle")
                    .on("click", Msg::Toggle)
                    .child(Node::text(if model.running { "pause" } else { "resume" })),
            )
            .child(Node::element("ol").with_children(laps));
        Document {
            title: format!("Stopwatch ({})", model.laps.len()),
            body,
        }
    }

    fn subscriptions(&self, model: &Model) -> Vec<Subscription<Msg>> {
        if model.running {
            vec![Subscription::every("clock", TICK, |_| Msg::Tick)]
        } else {
            Vec::new()
        }
    }
}

type App = Runtime<Stopwatch, DomStore, NoEffects>;

/// What a host does on a click: look up the listener and dispatch its command.
fn click(app: &mut App, name: &str) -> Result<(), Box<dyn Error>> {
    let store = app.executor();
    let node = store
        .find_element("name", name)
        .ok_or_else(|| format!("no button named {name}"))?;
    let command = store
        .binding(&node, "click")
        .ok_or_else(|| format!("button {name} has no click listener"))?
        .command
        .clone();
    app.dispatch(&command)?;
    Ok(())
}

fn render(node: &PatchNode, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    match node {
        PatchNode::Element {
            tag,
            attributes,
            children,
            ..
        } => {
            out.push_str(&format!("{pad}<{tag}"));
            for attr in attributes {
                out.push_str(&format!(" {}=\"{}\"", attr.name, attr.value));
            }
            out.push_str(">\n");
            for child in children {
                render(child, depth + 1, out);
            }
        }
        PatchNode::Text { value, .. } => out.push_str(&format!("{pad}{value}\n")),
    }
}

fn load_config() -> Result<RuntimeConfig, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(RuntimeConfig::from_toml_str(&std::fs::read_to_string(path)?)?),
        None => Ok(RuntimeConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let mut app = Runtime::start(
        Stopwatch,
        (),
        Url::parse("https://stopwatch.local/")?,
        DomStore::new(),
        NoEffects,
        config,
    )?;

    let started = Instant::now();
    let mut last_lap = 0;
    while started.elapsed() < RUN_FOR {
        app.wait_and_process(TICK * 2)?;
        let ticks = app.model().ticks;
        if ticks >= last_lap + 10 {
            last_lap = ticks;
            click(&mut app, "lap")?;
        }
        if app.model().laps.len() == 4 && app.model().running {
            click(&mut app, "toggle")?;
        }
        app.run_until_idle()?;
    }
    app.teardown();

    let store = app.executor();
    let mut out = String::new();
    render(&store.materialize()?, 0, &mut out);
    log::info!(
        "{} after {} batches, {} nodes, {} listeners",
        store.title(),
        store.batches_applied(),
        store.len(),
        store.listener_count()
    );
    print!("{out}");
    Ok(())
}
