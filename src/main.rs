use std::env;
use std::path::Path;
use std::process::ExitCode;

use log::error;

mod consts;
mod driver;
mod error;
mod fs;
mod fuse;
mod path;
mod store;
mod structure;
mod util;

#[cfg(test)]
mod testutil;

use fs::F15FS;

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("format") if args.len() == 3 => match F15FS::format(Path::new(&args[2])) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!("format failed: {}", err);
                ExitCode::FAILURE
            }
        },
        Some("mount") if args.len() == 4 => {
            let result = F15FS::mount(Path::new(&args[2]))
                .and_then(|volume| fuse::mount(volume, Path::new(&args[3])));
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    error!("mount failed: {}", err);
                    ExitCode::FAILURE
                }
            }
        }
        _ => {
            eprintln!("usage: f15fs format <image>");
            eprintln!("       f15fs mount <image> <mountpoint>");
            ExitCode::FAILURE
        }
    }
}
