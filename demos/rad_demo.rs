//! Runs the worked value-graph example from the original `rad.c`/
//! `parse.c` `main()`: a polynomial `g`, a composed sigmoid-shaped
//! function `f` built by substitution, and their sum `h = f(g) + g`,
//! differentiated in reverse mode.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rad_autodiff::{parse, print, Engine, Node};

#[derive(Parser)]
#[command(author, version, about = "Worked scalar-autodiff example")]
struct Args {
    /// Value of input [0]
    #[arg(long, default_value_t = 2.0)]
    x: f64,
    /// Value of input [1]
    #[arg(long, default_value_t = 3.0)]
    y: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let g = parse("[0]*[0] + [0]*[1]", vec![])?;
    let f = parse("{0}/({0} + 1)", vec![Node::input(0)])?;

    println!("{} {}", "g =".bold(), print(&g));
    println!("{} {}", "f({0}) =".bold(), print(&f));

    let h = Node::composition(f, vec![g.copy()]);
    let h = Node::add(h, g);

    let mut engine = Engine::new();
    let mut derivatives = vec![0.0, 0.0];
    let value = engine.backward_diff(&h, &[args.x, args.y], &mut derivatives);

    println!(
        "{}\nvalue: {:.6}\nderiv x: {:.6}\nderiv y: {:.6}",
        "h = f(g) + g".bold().green(),
        value,
        derivatives[0],
        derivatives[1]
    );

    Ok(())
}
