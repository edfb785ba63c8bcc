#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those holding buffers for the duration of a data transfer."
)]

use apa102_spi::{Apa102, PixelOrder};
use control_panel_async::{
    AdminChannel, BindingTable, Bootloader, LedFeedback, LocalMatrix, Panel, PanelConfig,
};
use embassy_executor::Spawner;
use embassy_time::Delay;
use esp_hal::{
    clock::CpuClock,
    gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull},
    i2c::master::I2c,
    peripherals::LPWR,
    spi::{master::Spi, Mode},
    time::Rate,
    timer::systimer::SystemTimer,
    usb_serial_jtag::UsbSerialJtag,
};
use esp_println::println;
use log::{info, warn};
use tca8418_async::{Tca8418, MAX_COLS, MAX_ROWS};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    println!("{}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Restarts into the ROM serial download mode.
struct DownloadMode;

impl Bootloader for DownloadMode {
    fn reboot_to_bootloader(&mut self) -> ! {
        LPWR::regs()
            .option1()
            .modify(|_, w| w.force_download_boot().set_bit());
        esp_hal::system::software_reset()
    }
}

#[esp_hal_embassy::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();
    info!("Control panel: polling TCA8418 + one LED per button on top and bottom strips");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let timer0 = SystemTimer::new(peripherals.SYSTIMER);
    esp_hal_embassy::init(timer0.alarm0);

    let panel_config = PanelConfig::default();

    // Bottom board: keypad expander on I2C0.
    let i2c_config = esp_hal::i2c::master::Config::default().with_frequency(Rate::from_khz(400));
    let keypad_i2c = I2c::new(peripherals.I2C0, i2c_config)
        .expect("I2C0 config")
        .with_sda(peripherals.GPIO8)
        .with_scl(peripherals.GPIO9)
        .into_async();
    let mut keypad = Tca8418::new(keypad_i2c);
    let expander = match keypad.init(MAX_ROWS, MAX_COLS).await {
        Ok(()) => {
            info!("TCA8418 ready (polling).");
            Some(keypad)
        }
        Err(err) => {
            warn!("TCA8418 not found at 0x34: {err:?}. Serving local matrix only.");
            None
        }
    };

    // Top board: 5x2 matrix on GPIO.
    let rows = [
        Output::new(peripherals.GPIO4, Level::High, OutputConfig::default()),
        Output::new(peripherals.GPIO5, Level::High, OutputConfig::default()),
        Output::new(peripherals.GPIO6, Level::High, OutputConfig::default()),
        Output::new(peripherals.GPIO7, Level::High, OutputConfig::default()),
        Output::new(peripherals.GPIO15, Level::High, OutputConfig::default()),
    ];
    let column_config = InputConfig::default().with_pull(Pull::Up);
    let columns = [
        Input::new(peripherals.GPIO16, column_config),
        Input::new(peripherals.GPIO17, column_config),
    ];
    let matrix = LocalMatrix::new(rows, columns, panel_config.row_settle_us);

    // One APA102 strip per SPI host.
    let spi_config = esp_hal::spi::master::Config::default()
        .with_frequency(Rate::from_mhz(4))
        .with_mode(Mode::_0);
    let top_spi = Spi::new(peripherals.SPI2, spi_config)
        .expect("SPI2 config")
        .with_sck(peripherals.GPIO12)
        .with_mosi(peripherals.GPIO11);
    let bottom_spi = Spi::new(peripherals.SPI3, spi_config)
        .expect("SPI3 config")
        .with_sck(peripherals.GPIO14)
        .with_mosi(peripherals.GPIO13);
    let top = Apa102::new_with_options(top_spi, 4, true, PixelOrder::BRG);
    let bottom = Apa102::new_with_options(bottom_spi, 4, true, PixelOrder::BRG);
    let leds = LedFeedback::new(top, bottom, &panel_config);

    let mut panel = Panel::new(expander, matrix, leds, BindingTable::new(), panel_config);
    if panel.init().is_err() {
        warn!("Initial LED frame did not reach both strips");
    }

    let mut admin = AdminChannel::new(UsbSerialJtag::new(peripherals.USB_DEVICE));
    info!("Ready. Send 'boot' to reboot into download mode.");

    panel.run(&mut admin, &mut DownloadMode, Delay).await
}
