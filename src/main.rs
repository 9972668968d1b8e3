use chime::app::AppStartupOptions;
use chime::model::{PickerRequest, PickerResult, SoundCategory, SoundUri};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    chime::logging::init()?;

    match chime::app::run_with_startup(options)? {
        Some(PickerResult::Accepted { uri: Some(uri) }) => println!("accepted {uri}"),
        Some(PickerResult::Accepted { uri: None }) => println!("accepted (silent)"),
        Some(PickerResult::Cancelled) | None => println!("cancelled"),
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> anyhow::Result<AppStartupOptions> {
    let mut request = PickerRequest::default();
    let mut extra_folders = Vec::new();

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--category" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--category requires ringtone|notification|alarm");
                };
                let Some(category) = SoundCategory::parse(value) else {
                    anyhow::bail!("unknown category {value}");
                };
                request.category = category;
            }
            "--existing" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--existing requires a sound uri");
                };
                request.existing_uri = Some(SoundUri::new(value.trim()));
            }
            "--default-uri" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--default-uri requires a sound uri");
                };
                request.default_uri = Some(SoundUri::new(value.trim()));
            }
            "--title" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--title requires text");
                };
                request.title = Some(value.clone());
            }
            "--flags" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--flags requires a bitmask");
                };
                request.attribute_flags = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("--flags expects an unsigned integer"))?;
            }
            "--no-default" => request.show_default = false,
            "--no-silent" => request.show_silent = false,
            "--no-buttons" => request.show_ok_cancel = false,
            "--add" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--add requires a folder path");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--add cannot be empty");
                }
                extra_folders.push(PathBuf::from(value.trim()));
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }

    Ok(AppStartupOptions {
        request,
        extra_folders,
    })
}

fn print_help() {
    println!("Chime sound picker");
    println!("  --category <kind>    ringtone | notification | alarm");
    println!("  --existing <uri>     Sound to pre-check");
    println!("  --default-uri <uri>  Sound behind the Default row");
    println!("  --title <text>       Picker title");
    println!("  --flags <n>          Audio attribute flag bitmask");
    println!("  --no-default         Hide the Default row");
    println!("  --no-silent          Hide the None row");
    println!("  --no-buttons         Emit the result on selection");
    println!("  --add <folder>       Add a sound folder for this run");
}
