use std::collections::BTreeMap;

use adbwire_client::{Device, DeviceState};

use crate::cmd::{GetpropArgs, RebootArgs, Target};
use crate::exit::{client_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_properties, print_value, OutputFormat};

pub fn getprop(args: GetpropArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    let mut device = Device::new(target.device_serial()?, DeviceState::Device);
    let properties = device
        .properties(&target.ctx)
        .map_err(|err| client_error("getprop failed", err))?;

    match args.name {
        Some(name) => match properties.get(&name) {
            Some(value) => {
                print_value(&name, value, format);
                Ok(SUCCESS)
            }
            None => Ok(FAILURE),
        },
        None => {
            let sorted: BTreeMap<&str, &str> = properties
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect();
            print_properties(&sorted, format);
            Ok(SUCCESS)
        }
    }
}

pub fn reboot(args: RebootArgs, target: &Target) -> CliResult<i32> {
    let device = Device::new(target.device_serial()?, DeviceState::Device);
    device
        .reboot(&target.ctx, args.target.as_deref())
        .map_err(|err| client_error("reboot failed", err))?;
    Ok(SUCCESS)
}
