use crate::cmd::{load_catalog, ProfilesArgs};
use crate::exit::{CliError, CliResult, SUCCESS};
use crate::output::{print_profile, print_profiles, OutputFormat};

pub fn run(args: ProfilesArgs, format: OutputFormat) -> CliResult<i32> {
    let catalog = load_catalog(args.profiles.as_deref())?;
    match args.eep {
        Some(id) => {
            let profile = catalog
                .get(&id)
                .ok_or_else(|| CliError::usage(format!("no profile {id}")))?;
            print_profile(profile, format);
        }
        None => print_profiles(catalog.profiles(), format),
    }
    Ok(SUCCESS)
}
