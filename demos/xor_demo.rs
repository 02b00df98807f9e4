//! Trains a 2-3-1 dense sigmoid network on XOR by gradient descent with
//! momentum, reproducing `neurons.c`'s network-construction and
//! `rad_teach` training loop on top of the core autodiff engine.

use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use plotters::prelude::*;
use rand::Rng;

use rad_autodiff::{parse, Engine, Node};

#[derive(Parser)]
#[command(author, version, about = "XOR-regression training demo")]
struct Args {
    /// Number of training iterations.
    #[arg(long, default_value_t = 100_000)]
    iterations: usize,
    /// Gradient-descent step size.
    #[arg(long, default_value_t = 0.05)]
    step: f64,
    /// Where to write the per-epoch loss curve.
    #[arg(long, default_value = "training_loss.png")]
    plot_path: String,
    /// Where to write the raw per-epoch loss log.
    #[arg(long, default_value = "training_loss.csv")]
    log_path: String,
}

/// `custom_exp` from `neurons.c`: returns `exp(x)` and its own derivative
/// (itself), used beneath a `0.0 - [0]` negation so composing them yields
/// `exp(-x)`.
fn custom_exp() -> rad_autodiff::CustomFn {
    Rc::new(|input: &[f64], grad: &mut [f64]| {
        let v = input[0].exp();
        grad[0] = v;
        v
    })
}

fn sigmoid_activation() -> Result<Node> {
    let neg_x = parse("0.0 - [0]", vec![])?;
    let exp_neg_x = Node::custom(custom_exp(), vec![neg_x]);
    Ok(parse("1/(1 + {0})", vec![exp_neg_x])?)
}

fn input_layer(num_neurons: usize, input_start: usize) -> Vec<Node> {
    (0..num_neurons).map(|i| Node::input(input_start + i)).collect()
}

/// One dense layer: every neuron is `activation(Σ w_i * prev[i] + b)`,
/// each weight and bias drawn from the next unused slot of `parameter`.
fn new_layer(
    num_neurons: usize,
    prev_layer: Vec<Node>,
    activation: &Node,
    parameter: &mut usize,
) -> Vec<Node> {
    let prev_neurons = prev_layer.len();
    let mut output = Vec::with_capacity(num_neurons);

    for _ in 0..num_neurons {
        let mut neuron = Node::mul(prev_layer[0].copy(), Node::input(*parameter));
        *parameter += 1;
        for prev in prev_layer.iter().take(prev_neurons).skip(1) {
            neuron = Node::add(neuron, Node::mul(prev.copy(), Node::input(*parameter)));
            *parameter += 1;
        }
        neuron = Node::add(neuron, Node::input(*parameter));
        *parameter += 1;
        output.push(Node::composition(activation.copy(), vec![neuron]));
    }

    for n in prev_layer {
        n.discard();
    }
    output
}

/// Squared error between the network's output layer and target `[0]`.
fn net_error(layer: &[Node]) -> Node {
    let diff = Node::sub(layer[0].copy(), Node::input(0));
    let mut output = Node::mul(diff.copy(), diff);
    for neuron in &layer[1..] {
        let diff = Node::sub(neuron.copy(), Node::input(0));
        output = Node::add(output, Node::mul(diff.copy(), diff));
    }
    output
}

/// One gradient-descent step with 0.75x momentum: existing derivatives
/// are decayed before the new reverse pass accumulates onto them.
fn teach(
    engine: &mut Engine,
    error_func: &Node,
    parameters: &mut [f64],
    derivatives: &mut [f64],
    step: f64,
    parameter_start: usize,
) -> f64 {
    for d in derivatives[parameter_start..].iter_mut() {
        *d *= 0.75;
    }
    let error = engine.backward_diff(error_func, parameters, derivatives);
    for (p, d) in parameters[parameter_start..]
        .iter_mut()
        .zip(&derivatives[parameter_start..])
    {
        *p -= d * step;
    }
    error
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut rng = rand::thread_rng();

    let activation = sigmoid_activation()?;
    let layer0 = input_layer(2, 1);
    let mut parameter = 3usize;
    let layer1 = new_layer(3, layer0, &activation, &mut parameter);
    let layer2 = new_layer(1, layer1, &activation, &mut parameter);
    let error_func = net_error(&layer2);

    let mut parameters = vec![0.0f64; parameter];
    let mut derivatives = vec![0.0f64; parameter];
    for p in parameters.iter_mut().skip(3) {
        *p = rng.gen_range(-1.0..1.0);
    }

    let mut engine = Engine::new();
    let mut losses: Vec<(f64, f64)> = Vec::new();
    let mut running_error = 0.0;

    for epoch in 0..args.iterations {
        let in0: i32 = rng.gen_range(0..2);
        let in1: i32 = rng.gen_range(0..2);
        parameters[0] = if in0 == in1 { 0.0 } else { 1.0 };
        parameters[1] = in0 as f64;
        parameters[2] = in1 as f64;

        let error = teach(
            &mut engine,
            &error_func,
            &mut parameters,
            &mut derivatives,
            args.step,
            3,
        );
        running_error += error;

        if epoch % 1000 == 0 {
            let avg = running_error / 1000.0_f64.min((epoch + 1) as f64);
            losses.push((epoch as f64, avg));
            running_error = 0.0;
            tracing::info!(epoch, avg_error = avg, "training progress");
        }
    }

    println!(
        "{} {:.4}",
        "final parameters (weights):".bold(),
        parameters[3..]
            .iter()
            .map(|w| format!("{w:.3}"))
            .collect::<Vec<_>>()
            .join(", ")
    );

    write_loss_log(&args.log_path, &losses)?;
    plot_losses(&args.plot_path, &losses)?;

    println!(
        "{}",
        format!("wrote {} and {}", args.log_path, args.plot_path).green()
    );

    Ok(())
}

fn write_loss_log(path: &str, losses: &[(f64, f64)]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("opening {path}"))?;
    writer.write_record(["epoch", "avg_error"])?;
    for (epoch, avg) in losses {
        writer.write_record([epoch.to_string(), avg.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

fn plot_losses(path: &str, losses: &[(f64, f64)]) -> Result<()> {
    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_epoch = losses.last().map(|(e, _)| *e).unwrap_or(1.0).max(1.0);
    let max_loss = losses.iter().map(|(_, l)| *l).fold(0.0, f64::max).max(0.01);

    let mut chart = ChartBuilder::on(&root)
        .caption("XOR training loss", ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0..max_epoch, 0.0..max_loss)?;

    chart.configure_mesh().draw()?;
    chart.draw_series(LineSeries::new(
        losses.iter().map(|(e, l)| (*e, *l)),
        &RED,
    ))?;

    root.present()?;
    Ok(())
}
