use esp_panel::backlight::LedcPartial;
use esp_panel::bus::dsi::{DpiPanelPartial, DpiPixelFormat, VideoTiming};
use esp_panel::bus::rgb::RgbPanelPartial;
use esp_panel::bus::spi::{QspiPanelIoPartial, SpiIoFlags, SpiPanelIoPartial};
use esp_panel::host::{I2cHostPartial, I2cMode, QspiHostPartial};
use esp_panel::{Config, PartialConfig, GPIO_NUM_NC};
use proptest::prelude::*;

#[test]
fn full_is_none_until_promoted() {
    let mut config = Config::from_partial(I2cHostPartial::new(18, 8));
    assert!(!config.is_full());
    assert!(config.full().is_none());
    assert_eq!(config.partial(), Some(&I2cHostPartial::new(18, 8)));

    config.convert_partial_to_full();
    assert!(config.is_full());
    assert!(config.partial().is_none());
    assert_eq!(config.full().map(|c| c.clk_speed), Some(400_000));
}

#[test]
fn promoted_does_not_mutate() {
    let config: Config<I2cHostPartial> = I2cHostPartial::new(18, 8).into();
    let full = config.promoted();

    assert!(!config.is_full());
    assert_eq!(full.mode, I2cMode::Master);
    assert_eq!(config.into_full(), full);
}

#[test]
fn full_mut_edits_survive_promotion() {
    let mut config = Config::from_partial(I2cHostPartial::new(18, 8));
    config.full_mut().clk_speed = 1_000_000;
    config.convert_partial_to_full();
    assert_eq!(config.full().map(|c| c.clk_speed), Some(1_000_000));
}

#[test]
fn spi_and_qspi_io_defaults() {
    let spi = SpiPanelIoPartial::new(10, 9).to_full();
    assert_eq!((spi.pclk_hz, spi.trans_queue_depth, spi.lcd_cmd_bits), (40_000_000, 10, 8));
    assert!(spi.flags.is_empty());

    let qspi = QspiPanelIoPartial::new(10).to_full();
    assert_eq!(qspi.dc_gpio_num, GPIO_NUM_NC);
    assert_eq!(qspi.lcd_cmd_bits, 32);
    assert_eq!(qspi.flags, SpiIoFlags::QUAD_MODE);

    let host = QspiHostPartial::new(47, [21, 48, 40, 39]).to_full();
    assert_eq!(
        (host.mosi_io_num, host.miso_io_num, host.quadwp_io_num, host.quadhd_io_num),
        (21, 48, 40, 39)
    );
    assert_eq!(host.data4_io_num, GPIO_NUM_NC);
}

#[test]
fn dpi_pixel_format_from_bits() {
    let dpi = |pixel_bits| {
        DpiPanelPartial {
            dpi_clock_freq_mhz: 52,
            pixel_bits,
            timing: VideoTiming::default(),
            use_dma2d: false,
        }
        .to_full()
    };
    assert_eq!(dpi(16).pixel_format, DpiPixelFormat::Rgb565);
    assert_eq!(dpi(18).pixel_format, DpiPixelFormat::Rgb666);
    assert_eq!(dpi(24).pixel_format, DpiPixelFormat::Rgb888);
    assert_eq!(dpi(24).num_fbs, 1);
}

#[test]
fn rgb_frame_buffer_depth() {
    let mut panel = RgbPanelPartial::new(480, 480, 16_000_000);
    assert_eq!(panel.to_full().bits_per_pixel, 16);

    panel.pixel_bits = 24;
    assert_eq!(panel.to_full().bits_per_pixel, 16);

    panel.data_width = 8;
    assert_eq!(panel.to_full().bits_per_pixel, 24);
}

#[test]
fn ledc_duty_for_percent() {
    let ledc = LedcPartial { io_num: 45, on_level_high: true }.to_full();
    assert_eq!(ledc.timer.duty_resolution, 13);
    assert_eq!(ledc.duty_for(0), 0);
    assert_eq!(ledc.duty_for(100), 8191);
    assert_eq!(ledc.duty_for(200), 8191);
    assert!(!ledc.channel.output_invert);
}

fn i2c_host() -> impl Strategy<Value = I2cHostPartial> {
    (0i32..48, 0i32..48, any::<bool>(), any::<bool>(), 1u32..1_000_000).prop_map(
        |(scl, sda, scl_pullup, sda_pullup, clk_speed_hz)| I2cHostPartial {
            sda_io_num: sda,
            scl_io_num: scl,
            sda_pullup,
            scl_pullup,
            clk_speed_hz,
        },
    )
}

proptest! {
    #[test]
    fn converting_twice_equals_converting_once(partial in i2c_host()) {
        let mut once = Config::from_partial(partial);
        once.convert_partial_to_full();

        let mut twice = Config::from_partial(partial);
        twice.convert_partial_to_full();
        twice.convert_partial_to_full();

        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.full(), Some(&partial.to_full()));
    }

    #[test]
    fn rgb_conversion_is_idempotent(
        width in prop::sample::select(vec![8u8, 16]),
        bits in prop::sample::select(vec![16u8, 18, 24]),
    ) {
        let mut panel = RgbPanelPartial::new(800, 480, 16_000_000);
        panel.data_width = width;
        panel.pixel_bits = bits;

        let mut config = Config::from_partial(panel);
        let promoted = config.promoted();
        config.convert_partial_to_full();
        config.convert_partial_to_full();
        prop_assert_eq!(config.full(), Some(&promoted));
    }
}
