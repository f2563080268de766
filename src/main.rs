use anyhow::{Context, ensure};
use clap::{Args, Parser, Subcommand};
use libcint::prelude::*;
use rstsr::prelude::*;
use rstsr_incore_jk::prelude::*;
use rstsr_incore_jk::{dense, driver, jk, pack, util};
use npyz::WriterBuilder;
use std::io::{BufWriter, Write};

#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct CliParser {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct DriverArgs {
    #[clap(long = "threads", help = "Size of a dedicated thread pool (default: global rayon pool)")]
    threads: Option<usize>,

    #[clap(long = "chunk", default_value_t = 4, help = "Minimal number of outer pairs per task")]
    chunk: usize,

    #[clap(long = "check-finite", help = "Reject NaN or infinite inputs")]
    check_finite: bool,
}

impl From<&DriverArgs> for JKConfig {
    fn from(args: &DriverArgs) -> Self {
        JKConfig { chunk_size: args.chunk, num_threads: args.threads, check_finite: args.check_finite, cancel: None }
    }
}

#[derive(Args, Debug)]
struct JkArgs {
    #[clap(short, long = "mol", help = "Path to the json file containing molecular data")]
    mol_file: String,

    #[clap(long = "symm", default_value = "s8", help = "Storage class of the packed integrals")]
    symm: EriSymm,

    #[clap(long = "dm", help = "Density matrix in npy format (default: overlap matrix)")]
    dm_file: Option<String>,

    #[clap(long = "hermi", help = "Density matrix is symmetric")]
    hermi: bool,

    #[clap(flatten)]
    driver: DriverArgs,
}

#[derive(Args, Debug)]
struct ContractArgs {
    #[clap(long = "eri", help = "Packed integrals in npy format, read as a flat buffer")]
    eri_file: String,

    #[clap(long = "dm", help = "Density matrix in npy format")]
    dm_file: String,

    #[clap(long = "nao", help = "Basis dimension")]
    nao: usize,

    #[clap(long = "vj", help = "J kernel name, see `kernels`")]
    vj: Option<JKernel>,

    #[clap(long = "vk", help = "K kernel name, see `kernels`")]
    vk: Option<KKernel>,

    #[clap(short, long = "out", default_value = "out", help = "Prefix of the output npy files")]
    out: String,

    #[clap(flatten)]
    driver: DriverArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(name = "jk", about = "Build J and K of a molecule from packed integrals")]
    Jk(JkArgs),

    #[clap(name = "contract", about = "Run the contraction driver on user buffers")]
    Contract(ContractArgs),

    #[clap(name = "kernels", about = "List the available pair kernels")]
    Kernels,
}

/// Reads a c-contiguous npy array as a flat buffer and its shape.
fn vec_from_file(fname: &str) -> anyhow::Result<(Vec<f64>, Vec<usize>)> {
    let bytes = std::fs::read(fname).with_context(|| format!("cannot read {fname}"))?;
    let npy = npyz::NpyFile::new(&bytes[..])?;
    ensure!(npy.order() == npyz::Order::C, "{fname}: fortran-ordered arrays are not supported");
    let shape = npy.shape().iter().map(|x| *x as usize).collect::<Vec<usize>>();
    let data = npy.into_vec::<f64>()?;
    Ok((data, shape))
}

fn tensor_from_file(fname: &str) -> anyhow::Result<Tsr> {
    let device = DeviceTsr::default();
    let (data, shape) = vec_from_file(fname)?;
    Ok(rt::asarray((data, shape.c(), &device)))
}

fn vec_to_file(fname: &str, data: &[f64], shape: &[u64]) -> anyhow::Result<()> {
    let file = std::fs::File::create(fname).with_context(|| format!("cannot create {fname}"))?;
    let mut buf = BufWriter::new(file);
    let mut writer = npyz::WriteOptions::new().default_dtype().shape(shape).writer(&mut buf).begin_nd()?;
    writer.extend(data.iter().copied())?;
    writer.finish()?;
    buf.flush()?;
    Ok(())
}

fn run_jk(args: &JkArgs) -> anyhow::Result<()> {
    let config = JKConfig::from(&args.driver);
    let cint_data = CInt::from_json(&args.mol_file);
    let nao = cint_data.nao();

    let timer = std::time::Instant::now();
    let int2e = util::intor_row_major(&cint_data, "int2e");
    let eri = pack::pack_eri(&util::tensor_to_vec(int2e.view()), nao, args.symm)?;
    println!("Time elapsed (integrals, {} packed, {} elements): {:?}", args.symm, eri.len(), timer.elapsed());

    let dm = match &args.dm_file {
        Some(fname) => tensor_from_file(fname)?,
        None => util::intor_row_major(&cint_data, "int1e_ovlp"),
    };
    ensure!(dm.shape()[..] == [nao, nao][..], "density matrix shape {:?}, expected [{nao}, {nao}]", dm.shape());

    let timer = std::time::Instant::now();
    let dm_vec = util::tensor_to_vec(dm.view());
    let JKResults { vj, vk } =
        jk::get_jk_incore_with_symm(&eri, args.symm, dm_vec, nao, args.hermi, true, true, &config)?;
    println!("Time elapsed (packed J/K): {:?}", timer.elapsed());

    let timer = std::time::Instant::now();
    let reference = dense::get_jk_dense(&int2e, dm.view(), true, true)?;
    println!("Time elapsed (dense J/K): {:?}", timer.elapsed());

    for (label, packed, full) in [("J", vj, reference.vj), ("K", vk, reference.vk)] {
        if let (Some(packed), Some(full)) = (packed, full) {
            let diff = util::max_abs_diff(&util::tensor_to_vec(packed.view()), &util::tensor_to_vec(full.view()));
            println!("{label}: max |packed - dense| = {diff:.3e}");
        }
    }
    Ok(())
}

fn run_contract(args: &ContractArgs) -> anyhow::Result<()> {
    let config = JKConfig::from(&args.driver);
    let n = args.nao;
    let (eri, _) = vec_from_file(&args.eri_file)?;
    let (dm, _) = vec_from_file(&args.dm_file)?;

    let dmj = match args.vj {
        Some(JKernel::S8TriDm) if dm.len() == n * n => util::fold_tril(&dm, n),
        _ => dm.clone(),
    };
    let mut vj = vec![0.0; n * n];
    let mut vk = vec![0.0; n * n];
    let j_task = args.vj.zip(Some(vj.as_mut_slice())).map(|(fvj, vj)| (fvj, dmj.as_slice(), vj));
    let k_task = args.vk.zip(Some(vk.as_mut_slice())).map(|(fvk, vk)| (fvk, dm.as_slice(), vk));

    let timer = std::time::Instant::now();
    driver::incore_drv_with(&eri, n, j_task, k_task, &config)?;
    println!("Time elapsed (contraction): {:?}", timer.elapsed());

    let shape = [n as u64, n as u64];
    if let Some(fvj) = args.vj {
        let fname = format!("{}_vj.npy", args.out);
        vec_to_file(&fname, &vj, &shape)?;
        println!("{fvj} ({}, {:?} fill) written to {fname}", fvj.contraction(), fvj.fill());
    }
    if let Some(fvk) = args.vk {
        let fname = format!("{}_vk.npy", args.out);
        vec_to_file(&fname, &vk, &shape)?;
        println!("{fvk} ({}, {:?} fill) written to {fname}", fvk.contraction(), fvk.fill());
    }
    Ok(())
}

fn print_kernels() {
    println!("{:<14} {:<6} {:<12} fill", "kernel", "symm", "pattern");
    for kernel in AnyKernel::all() {
        println!(
            "{:<14} {:<6} {:<12} {:?}",
            kernel.name(),
            kernel.symm().name(),
            kernel.contraction().subscripts(),
            kernel.fill()
        );
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = CliParser::parse();

    match args.command {
        Command::Jk(cli_args) => run_jk(&cli_args)?,
        Command::Contract(cli_args) => run_contract(&cli_args)?,
        Command::Kernels => print_kernels(),
    }
    Ok(())
}
