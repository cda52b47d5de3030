use crate::cmd::{BeepAction, BeepArgs};
use crate::exit::{driver_error, CliResult, SUCCESS};
use crate::output::{print_beep, OutputFormat};

pub fn run(args: BeepArgs, format: OutputFormat) -> CliResult<i32> {
    let mut matrix = args.device.open()?;

    let beep = match args.action {
        BeepAction::On | BeepAction::Off => {
            let on = args.action == BeepAction::On;
            matrix
                .set_beep(on)
                .map_err(|err| driver_error("set beeper", err))?;
            on
        }
        BeepAction::Query => matrix
            .get_beep()
            .map_err(|err| driver_error("query beeper", err))?,
    };

    let device = matrix.endpoint().to_string();
    matrix
        .disconnect()
        .map_err(|err| driver_error("disconnect failed", err))?;

    print_beep(&device, beep, format);
    Ok(SUCCESS)
}
