//! Host kinds registered with [`host_registry`].
//!
//! One registry per kind: I2C ports, SPI buses and the MIPI-DSI bus. Buses and
//! IO expanders acquire their host from the registry in `init()` and bring it
//! up in `begin()`.

use core::marker::PhantomData;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use host_registry::{Calibrate, HostHandle, HostId, HostKind, HostRegistry, Release};

use crate::config::PartialConfig;
use crate::error::Error;
use crate::native::{EspError, Platform, RawHandle, GPIO_NUM_NC};

pub const I2C_HOST_NUM: usize = 2;
pub const SPI_HOST_NUM: usize = 3;
pub const DSI_HOST_NUM: usize = 1;

/// Lock guarding each registry slot.
pub type HostMutex = CriticalSectionRawMutex;

pub type I2cHosts<P> = HostRegistry<HostMutex, I2cHost<P>, I2C_HOST_NUM>;
pub type SpiHosts<P> = HostRegistry<HostMutex, SpiHost<P>, SPI_HOST_NUM>;
pub type DsiHosts<P> = HostRegistry<HostMutex, DsiHost<P>, DSI_HOST_NUM>;

/// The host registries of one platform.
///
/// Usually a `static`, shared by every bus and IO expander of the firmware.
pub struct Hosts<P: Platform> {
    pub i2c: I2cHosts<P>,
    pub spi: SpiHosts<P>,
    pub dsi: DsiHosts<P>,
}

impl<P: Platform> Hosts<P> {
    pub const fn new() -> Self {
        Self { i2c: HostRegistry::new(), spi: HostRegistry::new(), dsi: HostRegistry::new() }
    }
}

impl<P: Platform> Default for Hosts<P> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// I2C
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum I2cMode {
    Slave = 0,
    Master = 1,
}

/// `i2c_config_t` for master mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(C)]
pub struct I2cHostConfig {
    pub mode: I2cMode,
    pub sda_io_num: i32,
    pub scl_io_num: i32,
    pub sda_pullup_en: bool,
    pub scl_pullup_en: bool,
    pub clk_speed: u32,
    pub clk_flags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cHostPartial {
    pub sda_io_num: i32,
    pub scl_io_num: i32,
    pub sda_pullup: bool,
    pub scl_pullup: bool,
    pub clk_speed_hz: u32,
}

impl I2cHostPartial {
    /// 400 kHz with internal pull-ups.
    pub const fn new(scl_io_num: i32, sda_io_num: i32) -> Self {
        Self {
            sda_io_num,
            scl_io_num,
            sda_pullup: true,
            scl_pullup: true,
            clk_speed_hz: 400_000,
        }
    }
}

impl Default for I2cHostPartial {
    fn default() -> Self {
        Self::new(GPIO_NUM_NC, GPIO_NUM_NC)
    }
}

impl PartialConfig for I2cHostPartial {
    type Full = I2cHostConfig;

    fn to_full(&self) -> I2cHostConfig {
        I2cHostConfig {
            mode: I2cMode::Master,
            sda_io_num: self.sda_io_num,
            scl_io_num: self.scl_io_num,
            sda_pullup_en: self.sda_pullup,
            scl_pullup_en: self.scl_pullup,
            clk_speed: self.clk_speed_hz,
            clk_flags: 0,
        }
    }
}

impl Calibrate for I2cHostConfig {
    fn calibrate(&self, requested: &Self) -> bool {
        if self == requested {
            return true;
        }
        warn!(
            "[I2C] host config mismatch: sda {}/{}, scl {}/{}, clk {}/{}",
            self.sda_io_num,
            requested.sda_io_num,
            self.scl_io_num,
            requested.scl_io_num,
            self.clk_speed,
            requested.clk_speed
        );
        false
    }
}

pub struct I2cHost<P>(PhantomData<fn() -> P>);

impl<P: Platform> HostKind for I2cHost<P> {
    type Config = I2cHostConfig;
    type Native = ();
    type Error = EspError;

    const NAME: &'static str = "I2C";

    fn begin(id: HostId, config: &I2cHostConfig) -> Result<(), EspError> {
        P::i2c_host_begin(id, config)
    }

    fn end(id: HostId, _native: ()) -> Result<(), EspError> {
        P::i2c_host_end(id)
    }
}

// ---------------------------------------------------------------------------
// SPI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum SpiDma {
    Disabled = 0,
    Ch1 = 1,
    Ch2 = 2,
    Auto = 3,
}

/// `spi_bus_config_t` plus the DMA channel passed to `spi_bus_initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(C)]
pub struct SpiHostConfig {
    pub mosi_io_num: i32,
    pub miso_io_num: i32,
    pub sclk_io_num: i32,
    pub quadwp_io_num: i32,
    pub quadhd_io_num: i32,
    pub data4_io_num: i32,
    pub data5_io_num: i32,
    pub data6_io_num: i32,
    pub data7_io_num: i32,
    pub max_transfer_sz: i32,
    pub flags: u32,
    pub intr_flags: i32,
    pub dma: SpiDma,
}

impl SpiHostConfig {
    const fn unused() -> Self {
        Self {
            mosi_io_num: GPIO_NUM_NC,
            miso_io_num: GPIO_NUM_NC,
            sclk_io_num: GPIO_NUM_NC,
            quadwp_io_num: GPIO_NUM_NC,
            quadhd_io_num: GPIO_NUM_NC,
            data4_io_num: GPIO_NUM_NC,
            data5_io_num: GPIO_NUM_NC,
            data6_io_num: GPIO_NUM_NC,
            data7_io_num: GPIO_NUM_NC,
            max_transfer_sz: 0,
            flags: 0,
            intr_flags: 0,
            dma: SpiDma::Auto,
        }
    }
}

/// Single-line SPI host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiHostPartial {
    pub sclk_io_num: i32,
    pub mosi_io_num: i32,
    pub miso_io_num: i32,
}

impl SpiHostPartial {
    pub const fn new(sclk_io_num: i32, mosi_io_num: i32, miso_io_num: i32) -> Self {
        Self { sclk_io_num, mosi_io_num, miso_io_num }
    }
}

impl PartialConfig for SpiHostPartial {
    type Full = SpiHostConfig;

    fn to_full(&self) -> SpiHostConfig {
        SpiHostConfig {
            mosi_io_num: self.mosi_io_num,
            miso_io_num: self.miso_io_num,
            sclk_io_num: self.sclk_io_num,
            ..SpiHostConfig::unused()
        }
    }
}

/// Quad SPI host; data lines 0-3 map onto MOSI, MISO, WP and HD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QspiHostPartial {
    pub sclk_io_num: i32,
    pub data_io_nums: [i32; 4],
}

impl QspiHostPartial {
    pub const fn new(sclk_io_num: i32, data_io_nums: [i32; 4]) -> Self {
        Self { sclk_io_num, data_io_nums }
    }
}

impl PartialConfig for QspiHostPartial {
    type Full = SpiHostConfig;

    fn to_full(&self) -> SpiHostConfig {
        let [d0, d1, d2, d3] = self.data_io_nums;
        SpiHostConfig {
            sclk_io_num: self.sclk_io_num,
            mosi_io_num: d0,
            miso_io_num: d1,
            quadwp_io_num: d2,
            quadhd_io_num: d3,
            ..SpiHostConfig::unused()
        }
    }
}

impl Calibrate for SpiHostConfig {
    fn calibrate(&self, requested: &Self) -> bool {
        if self == requested {
            return true;
        }
        warn!(
            "[SPI] host config mismatch: sclk {}/{}, mosi {}/{}, miso {}/{}, max transfer {}/{}",
            self.sclk_io_num,
            requested.sclk_io_num,
            self.mosi_io_num,
            requested.mosi_io_num,
            self.miso_io_num,
            requested.miso_io_num,
            self.max_transfer_sz,
            requested.max_transfer_sz
        );
        false
    }
}

pub struct SpiHost<P>(PhantomData<fn() -> P>);

impl<P: Platform> HostKind for SpiHost<P> {
    type Config = SpiHostConfig;
    type Native = ();
    type Error = EspError;

    const NAME: &'static str = "SPI";

    fn begin(id: HostId, config: &SpiHostConfig) -> Result<(), EspError> {
        P::spi_host_begin(id, config)
    }

    fn end(id: HostId, _native: ()) -> Result<(), EspError> {
        P::spi_host_end(id)
    }
}

// ---------------------------------------------------------------------------
// MIPI-DSI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum DsiPhyClkSrc {
    #[default]
    Default = 0,
    Xtal = 1,
    PllF20M = 2,
}

/// `esp_lcd_dsi_bus_config_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(C)]
pub struct DsiHostConfig {
    pub bus_id: i32,
    pub num_data_lanes: u8,
    pub phy_clk_src: DsiPhyClkSrc,
    pub lane_bit_rate_mbps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsiHostPartial {
    pub data_lane_num: u8,
    pub lane_bit_rate_mbps: u32,
}

impl DsiHostPartial {
    pub const fn new(data_lane_num: u8, lane_bit_rate_mbps: u32) -> Self {
        Self { data_lane_num, lane_bit_rate_mbps }
    }
}

impl PartialConfig for DsiHostPartial {
    type Full = DsiHostConfig;

    fn to_full(&self) -> DsiHostConfig {
        DsiHostConfig {
            bus_id: 0,
            num_data_lanes: self.data_lane_num,
            phy_clk_src: DsiPhyClkSrc::Default,
            lane_bit_rate_mbps: self.lane_bit_rate_mbps,
        }
    }
}

impl Calibrate for DsiHostConfig {
    fn calibrate(&self, requested: &Self) -> bool {
        if self == requested {
            return true;
        }
        warn!(
            "[DSI] host config mismatch: lanes {}/{}, lane rate {}/{} Mbps",
            self.num_data_lanes,
            requested.num_data_lanes,
            self.lane_bit_rate_mbps,
            requested.lane_bit_rate_mbps
        );
        false
    }
}

pub struct DsiHost<P>(PhantomData<fn() -> P>);

impl<P: Platform> HostKind for DsiHost<P> {
    type Config = DsiHostConfig;
    type Native = RawHandle;
    type Error = EspError;

    const NAME: &'static str = "DSI";

    fn begin(id: HostId, config: &DsiHostConfig) -> Result<RawHandle, EspError> {
        P::dsi_host_begin(id, config)
    }

    fn end(id: HostId, bus: RawHandle) -> Result<(), EspError> {
        P::dsi_host_end(id, bus)
    }
}

// ---------------------------------------------------------------------------
// Link between a component and its host
// ---------------------------------------------------------------------------

/// A component's hold on one host of a registry.
pub(crate) struct HostLink<'r, K: HostKind, const N: usize> {
    hosts: &'r HostRegistry<HostMutex, K, N>,
    handle: Option<HostHandle<'r, HostMutex, K>>,
}

impl<'r, K: HostKind<Error = EspError>, const N: usize> HostLink<'r, K, N> {
    pub(crate) const fn new(hosts: &'r HostRegistry<HostMutex, K, N>) -> Self {
        Self { hosts, handle: None }
    }

    pub(crate) fn acquire(&mut self, id: HostId, config: &K::Config) -> Result<(), Error> {
        let handle = self.hosts.acquire(id, config)?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Bring the host up if it is held and not yet begun.
    pub(crate) fn begin(&self) -> Result<Option<K::Native>, Error> {
        match &self.handle {
            Some(handle) => Ok(Some(handle.begin()?)),
            None => Ok(None),
        }
    }

    pub(crate) fn native(&self) -> Option<K::Native> {
        self.handle.as_ref().and_then(HostHandle::native)
    }

    pub(crate) fn is_held(&self) -> bool {
        self.handle.is_some()
    }

    /// Drop the handle and tear the host down if nobody else holds it.
    pub(crate) fn release(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let id = handle.id();
        drop(handle);

        match self.hosts.try_release(id) {
            Ok(Release::Retained(users)) => {
                debug!("[{}] host {} still used by {}", K::NAME, id, users)
            }
            Ok(_) => {}
            Err(_) => error!("[{}] release of host {} failed", K::NAME, id),
        }
    }
}
