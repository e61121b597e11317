//! The InstrumentDriver trait.
//!
//! Every instrument driver wraps a [`Device`] and builds its domain
//! operations on [`Device::make_request`]. The identification commands that
//! all KCP instruments implement are provided here as default methods, so a
//! new driver only has to expose its device handle.

use async_trait::async_trait;

use crate::command::DeviceCommand;
use crate::connection::Connection;
use crate::decode::DecodedValue;
use crate::device::Device;
use crate::error::{Error, Result};

/// Device type and weighing capacity, as reported by `I2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInformation {
    /// Instrument type designation (e.g. `"PCB"`).
    pub device_type: String,
    /// Capacity including unit (e.g. `"250.000 g"`).
    pub capacity: String,
}

/// A driver for one class of KCP instrument.
///
/// Exchange methods take `&mut self`; share a driver between tasks by
/// wrapping it in a `tokio::sync::Mutex`.
#[async_trait]
pub trait InstrumentDriver: Send {
    /// The connection the driver's device talks over.
    type Connection: Connection;

    /// Human-readable instrument name, for logs.
    fn name(&self) -> &str;

    /// The underlying request engine.
    fn device(&self) -> &Device<Self::Connection>;

    /// The underlying request engine, mutably.
    fn device_mut(&mut self) -> &mut Device<Self::Connection>;

    /// `I0` -- list the KCP commands the instrument implements.
    ///
    /// The instrument answers with one begun frame per command
    /// (`I0 B <index> <command>`) and a final empty `I0 A`.
    async fn list_commands(&mut self) -> Result<Vec<String>> {
        let exchange = self
            .device_mut()
            .make_staged_request(&DeviceCommand::ListAllImplementedKcpCommands, &[])
            .await?;
        exchange
            .progress
            .iter()
            .map(|entry| DecodedValue::text_at(entry, 1).map(str::to_string))
            .collect()
    }

    /// `I1` -- KCP levels and versions, one entry per returned field.
    async fn query_kcp_versions(&mut self) -> Result<Vec<String>> {
        let values = self
            .device_mut()
            .make_request(&DeviceCommand::QueryKcpLevelsAndKcpVersions, &[])
            .await?;
        Ok(values.iter().map(ToString::to_string).collect())
    }

    /// `I2` -- device type and capacity.
    async fn query_device_information(&mut self) -> Result<DeviceInformation> {
        let values = self
            .device_mut()
            .make_request(&DeviceCommand::QueryDeviceInformationTypeCapacity, &[])
            .await?;
        Ok(DeviceInformation {
            device_type: DecodedValue::text_at(&values, 0)?.to_string(),
            capacity: DecodedValue::text_at(&values, 1)?.to_string(),
        })
    }

    /// `I3` -- device software version.
    async fn query_software_version(&mut self) -> Result<String> {
        let values = self
            .device_mut()
            .make_request(&DeviceCommand::QueryDeviceSoftwareVersion, &[])
            .await?;
        single_text(&values, "I3")
    }

    /// `I4` -- serial number.
    async fn query_serial_number(&mut self) -> Result<String> {
        let values = self
            .device_mut()
            .make_request(&DeviceCommand::QuerySerialNumber, &[])
            .await?;
        single_text(&values, "I4")
    }

    /// `I5` -- software identification number.
    async fn query_software_identification(&mut self) -> Result<String> {
        let values = self
            .device_mut()
            .make_request(&DeviceCommand::QuerySoftwareIdentificationNumber, &[])
            .await?;
        single_text(&values, "I5")
    }

    /// `IBIM` -- external model number.
    async fn query_model_number(&mut self) -> Result<String> {
        let values = self
            .device_mut()
            .make_request(&DeviceCommand::QuerySetBalanceExternalModelNumber, &[])
            .await?;
        single_text(&values, "IBIM")
    }

    /// `@` -- abort whatever the instrument is doing.
    ///
    /// Readings still in flight are skipped. To end a weight stream and keep
    /// those readings, cancel through the stream instead.
    async fn cancel(&mut self) -> Result<()> {
        self.device_mut()
            .make_request(&DeviceCommand::Cancel, &[])
            .await?;
        Ok(())
    }
}

fn single_text(values: &[DecodedValue], command: &str) -> Result<String> {
    match values.first() {
        Some(value) => Ok(value.to_string()),
        None => Err(Error::Decode(format!("{command} response has no value"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::frame::{RequestFrame, ResponseFrame, ResponseStatus};

    struct Replay(VecDeque<ResponseFrame>, Vec<String>);

    #[async_trait]
    impl Connection for Replay {
        async fn transceive(&mut self, request: &RequestFrame) -> Result<ResponseFrame> {
            self.1.push(request.command_id.clone());
            self.0.pop_front().ok_or(Error::Timeout)
        }
    }

    struct Generic {
        device: Device<Replay>,
    }

    #[async_trait]
    impl InstrumentDriver for Generic {
        type Connection = Replay;

        fn name(&self) -> &str {
            "generic"
        }

        fn device(&self) -> &Device<Replay> {
            &self.device
        }

        fn device_mut(&mut self) -> &mut Device<Replay> {
            &mut self.device
        }
    }

    fn driver(frames: Vec<ResponseFrame>) -> Generic {
        Generic {
            device: Device::new(Replay(frames.into(), Vec::new())),
        }
    }

    #[tokio::test]
    async fn serial_number_through_begun() {
        let mut d = driver(vec![
            ResponseFrame::begun("I4", &[]),
            ResponseFrame::accepted("I4", &[b"123"]),
        ]);
        assert_eq!(d.query_serial_number().await.unwrap(), "123");
        assert_eq!(d.device().connection().1, vec!["I4", ""]);
    }

    #[tokio::test]
    async fn list_commands_collects_begun_payloads() {
        let mut d = driver(vec![
            ResponseFrame::begun("I0", &[b"0", b"I0"]),
            ResponseFrame::begun("I0", &[b"1", b"I4"]),
            ResponseFrame::begun("I0", &[b"2", b"SIR"]),
            ResponseFrame::accepted("I0", &[]),
        ]);
        assert_eq!(d.list_commands().await.unwrap(), vec!["I0", "I4", "SIR"]);
    }

    #[tokio::test]
    async fn device_information_needs_two_fields() {
        let mut d = driver(vec![ResponseFrame::accepted("I2", &[b"PCB", b"250.000 g"])]);
        let info = d.query_device_information().await.unwrap();
        assert_eq!(info.device_type, "PCB");
        assert_eq!(info.capacity, "250.000 g");

        let mut d = driver(vec![ResponseFrame::accepted("I2", &[b"PCB"])]);
        assert!(matches!(
            d.query_device_information().await,
            Err(Error::Decode(_))
        ));
    }

    #[tokio::test]
    async fn versions_and_identifiers() {
        let mut d = driver(vec![
            ResponseFrame::accepted("I1", &[b"01", b"2.0"]),
            ResponseFrame::accepted("I3", &[b"1.07"]),
            ResponseFrame::accepted("I5", &[b"ID-5"]),
            ResponseFrame::accepted("IBIM", &[b"PCB 250-3"]),
        ]);
        assert_eq!(d.query_kcp_versions().await.unwrap(), vec!["01", "2.0"]);
        assert_eq!(d.query_software_version().await.unwrap(), "1.07");
        assert_eq!(d.query_software_identification().await.unwrap(), "ID-5");
        assert_eq!(d.query_model_number().await.unwrap(), "PCB 250-3");
    }

    #[tokio::test]
    async fn empty_identifier_is_decode_error() {
        let mut d = driver(vec![ResponseFrame::accepted("I4", &[])]);
        assert!(matches!(d.query_serial_number().await, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn cancel_rejection_surfaces() {
        let mut d = driver(vec![ResponseFrame::tagged(
            "@",
            ResponseStatus::InternalError,
            &[],
        )]);
        let err = d.cancel().await.unwrap_err();
        assert_eq!(err.status(), Some(ResponseStatus::InternalError));
        assert_eq!(d.name(), "generic");
    }
}
