use crate::cmd::StatusArgs;
use crate::exit::{driver_error, CliResult, SUCCESS};
use crate::output::{print_status, OutputFormat, Route, StatusReport};

pub fn run(args: StatusArgs, format: OutputFormat) -> CliResult<i32> {
    let mut matrix = args.device.open()?;

    let mapping = matrix
        .get_port_mapping()
        .map_err(|err| driver_error("query port mapping", err))?;
    let routes = mapping
        .into_iter()
        .map(|(output, input)| Route::new(output, input))
        .collect();

    let (inputs, outputs) = if args.connections {
        let inputs = matrix
            .get_inputs_status()
            .map_err(|err| driver_error("query input status", err))?;
        let outputs = matrix
            .get_outputs_status()
            .map_err(|err| driver_error("query output status", err))?;
        (Some(inputs), Some(outputs))
    } else {
        (None, None)
    };

    let report = StatusReport {
        device: matrix.endpoint().to_string(),
        routes,
        inputs,
        outputs,
    };
    matrix
        .disconnect()
        .map_err(|err| driver_error("disconnect failed", err))?;

    print_status(&report, args.numeric, format);
    Ok(SUCCESS)
}
