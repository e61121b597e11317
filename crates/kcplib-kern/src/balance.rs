//! KernLabBalance -- the [`InstrumentDriver`] for KERN lab balances.
//!
//! Every operation is a single [`Device`] exchange; staged (`B`) replies are
//! consumed by the engine, so a slow stable-weight measurement looks the
//! same to the caller as an immediate one. Continuous readout is handed off
//! to a [`WeightStream`] that borrows the balance for its lifetime.

use std::time::Duration;

use tracing::debug;

use kcplib_core::{Connection, DecodedValue, Device, InstrumentDriver, Result};

use crate::commands::{self, BalanceCommand};
use crate::stream::WeightStream;
use crate::types::{IndicationUnit, WeightValue};

/// Default time a weight stream may stay silent beyond its interval.
pub const DEFAULT_STREAM_STALL_GRACE: Duration = Duration::from_secs(2);

/// Balance-level settings, on top of the engine's
/// [`DeviceSettings`](kcplib_core::DeviceSettings).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSettings {
    /// How long past the stream interval a silent line is tolerated before
    /// the stream fails with [`Error::Timeout`](kcplib_core::Error::Timeout).
    pub stream_stall_grace: Duration,
}

impl Default for BalanceSettings {
    fn default() -> Self {
        BalanceSettings {
            stream_stall_grace: DEFAULT_STREAM_STALL_GRACE,
        }
    }
}

/// A KERN lab balance.
///
/// Usually constructed via [`KernBalanceBuilder`](crate::builder::KernBalanceBuilder).
pub struct KernLabBalance<C: Connection> {
    device: Device<C>,
    settings: BalanceSettings,
}

impl<C: Connection> KernLabBalance<C> {
    /// Wrap `device` with default balance settings.
    pub fn new(device: Device<C>) -> Self {
        Self::with_settings(device, BalanceSettings::default())
    }

    /// Wrap `device` with explicit balance settings.
    pub fn with_settings(device: Device<C>, settings: BalanceSettings) -> Self {
        KernLabBalance { device, settings }
    }

    /// The balance-level settings in effect.
    pub fn settings(&self) -> &BalanceSettings {
        &self.settings
    }

    /// Release the underlying device.
    pub fn into_device(self) -> Device<C> {
        self.device
    }

    /// `U <unit>` -- switch the display unit. Repeating the same unit is
    /// harmless.
    pub async fn set_indication_unit(&mut self, unit: &IndicationUnit) -> Result<()> {
        self.device
            .make_request(&BalanceCommand::SetIndicationUnit, &[unit.token()])
            .await?;
        debug!(%unit, "indication unit set");
        Ok(())
    }

    /// `SI` -- the current weight, stable or not.
    pub async fn weigh_immediately(&mut self) -> Result<WeightValue> {
        let values = self
            .device
            .make_request(&BalanceCommand::SendWeightValueImmediately, &[])
            .await?;
        weight_from(&values)
    }

    /// `S` -- the next stable weight. The balance holds the request open
    /// with `B` frames until the reading settles.
    pub async fn weigh_stable(&mut self) -> Result<WeightValue> {
        let values = self
            .device
            .make_request(&BalanceCommand::SendStableWeightValue, &[])
            .await?;
        weight_from(&values)
    }

    /// `T` -- tare, returning the stored tare weight.
    pub async fn tare(&mut self) -> Result<WeightValue> {
        let values = self
            .device
            .make_request(&BalanceCommand::Tare, &[])
            .await?;
        weight_from(&values)
    }

    /// `Z` -- zero the balance.
    pub async fn zero(&mut self) -> Result<()> {
        self.device
            .make_request(&BalanceCommand::Zero, &[])
            .await?;
        Ok(())
    }

    /// `SIR <ms>` -- start a continuous readout, one reading per `interval`.
    ///
    /// The returned stream is already active. End it with
    /// [`WeightStream::cancel`] and drain it to `None` before using the
    /// balance for anything else.
    pub async fn stream_weight(&mut self, interval: Duration) -> Result<WeightStream<'_, C>> {
        let mut stream =
            WeightStream::new(&mut self.device, interval, self.settings.stream_stall_grace);
        stream.activate().await?;
        Ok(stream)
    }
}

impl<C: Connection> InstrumentDriver for KernLabBalance<C> {
    type Connection = C;

    fn name(&self) -> &str {
        "KERN lab balance"
    }

    fn device(&self) -> &Device<C> {
        &self.device
    }

    fn device_mut(&mut self) -> &mut Device<C> {
        &mut self.device
    }
}

fn weight_from(values: &[DecodedValue]) -> Result<WeightValue> {
    let fields: Vec<String> = values.iter().map(ToString::to_string).collect();
    commands::parse_weight(&fields)
}
