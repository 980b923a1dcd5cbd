//! End-to-end tests: the demo world under the tick driver.

use gridlink::core::{TickConfig, TickDriver};
use gridlink::networking::SocketState;
use gridlink::{Demo, ServerConfig};

fn driver(config: &ServerConfig) -> TickDriver<Demo> {
    let demo = Demo::build(config.network.clone(), &config.demo).unwrap();
    let mut driver = TickDriver::new(&config.tick, demo);
    driver.add_action("world", |demo, _| {
        demo.world.tick();
        Ok(())
    });
    driver.add_action("client", |demo, _| Ok(demo.drive_client()?));
    driver
}

fn unpaced() -> ServerConfig {
    ServerConfig {
        tick: TickConfig { tick_rate: 0 },
        ..ServerConfig::default()
    }
}

#[test]
fn test_driver_keeps_session_alive_past_keepalive() {
    let mut driver = driver(&unpaced());
    driver.run_for(500);

    let demo = driver.state();
    assert_eq!(driver.stats().failed_actions, 0);
    assert_eq!(demo.world.current_tick(), 500);
    assert_eq!(demo.sessions_opened(), 1);
    assert!(demo.session().is_some());
    // Default cadence pings every 20 ticks; the last echo may still be in flight
    assert_eq!(demo.pings_sent(), 25);
    assert!(demo.echoes_received() >= 24);
}

#[test]
fn test_offline_server_forces_reconnect_attempts() {
    let mut driver = driver(&unpaced());
    driver.run_for(10);

    // Another thread takes the echo server offline for good
    let invoker = driver.invoker();
    std::thread::spawn(move || {
        assert!(invoker.invoke(|demo: &mut Demo| {
            let server = demo.server;
            demo.world.set_running(server, false).unwrap();
        }));
    })
    .join()
    .unwrap();

    // The teardown drops the session, the client retries into silence
    driver.step();
    let demo = driver.state();
    assert_eq!(demo.sessions_opened(), 2);
    let retry = demo.session().unwrap();
    assert_eq!(
        demo.world.socket(demo.client, retry).unwrap().state(),
        SocketState::HandshakeSyn
    );

    // Each attempt times out after the connection timeout and is retried
    driver.run_for(20);
    assert_eq!(driver.state().sessions_opened(), 3);
    assert_eq!(driver.stats().failed_actions, 0);
}

#[test]
fn test_config_file_drives_demo() {
    let config = ServerConfig::from_toml_str(
        r"
        [tick]
        tick_rate = 0

        [network]
        seed = 99

        [demo]
        echo_port = 4000
        ping_interval_ticks = 0
        ",
    )
    .unwrap();

    let mut driver = driver(&config);
    driver.run_for(50);

    let demo = driver.state();
    assert_eq!(demo.service.port(), 4000);
    assert_eq!(demo.pings_sent(), 0);
    assert_eq!(demo.world.stats().packets_dropped, 0);
}
