use crossterm::style::Stylize;
use dialoguer::{theme::ColorfulTheme, Confirm, Select};
use log::debug;
use serialport::{available_ports, SerialPortInfo, SerialPortType};

use super::{config::Config, ConnectArgs};
use crate::error::Error;

pub fn get_serial_port(args: &ConnectArgs, config: &Config) -> Result<String, Error> {
    // A serial port should be specified either as a command-line argument or in
    // the configuration file. In the case that both have been provided the
    // command-line argument takes precedence. Otherwise the user is asked to pick
    // one of the detected ports, and may have the choice remembered.
    if let Some(port) = &args.port {
        return Ok(port.clone());
    }

    if let Some(port) = &config.connection.serial {
        return Ok(port.clone());
    }

    let ports = available_ports().unwrap_or_default();
    debug!("Detected serial ports: {:#?}", ports);

    let port = select_serial_port(ports)?;

    let remember = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Remember this serial port for future use?")
        .interact_opt()?
        .unwrap_or_default();

    if remember {
        // Allow this operation to fail without terminating the application, but
        // inform the user if something goes wrong.
        if let Err(e) = config.save_with(|config| config.connection.serial = Some(port.clone())) {
            eprintln!("Failed to save config {:#}", e);
        }
    }

    Ok(port)
}

fn select_serial_port(ports: Vec<SerialPortInfo>) -> Result<String, Error> {
    if let [port] = ports.as_slice() {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Use serial port '{}'?", port.port_name))
            .default(true)
            .interact_opt()?
            .unwrap_or_default();

        return if confirmed {
            Ok(port.port_name.clone())
        } else {
            Err(Error::Cancelled)
        };
    }

    if ports.is_empty() {
        return Err(Error::NoSerial);
    }

    let items = ports.iter().map(describe_port).collect::<Vec<_>>();

    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Programmer serial port")
        .items(&items)
        .default(0)
        .interact_opt()?
        .ok_or(Error::Cancelled)?;

    Ok(ports[index].port_name.clone())
}

fn describe_port(port: &SerialPortInfo) -> String {
    match &port.port_type {
        SerialPortType::UsbPort(info) => {
            let product = info.product.as_deref().unwrap_or_default();
            format!(
                "{} - {} ({:04x}:{:04x})",
                port.port_name.as_str().bold(),
                product,
                info.vid,
                info.pid
            )
        }
        _ => port.port_name.clone(),
    }
}
