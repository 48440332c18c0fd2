//! Drives the correlation core end to end against a fake serial device built
//! from a `tokio::io::duplex` pair, in place of real hardware.

use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, DuplexStream},
    sync::{mpsc, Mutex},
};
use znp_core::{Application, BoxFuture, DeviceConfig, RequestError, Znp, ZnpConfig};
use znp_proto::{
    CommandInstance, DecodedCommand, FrameCodec, GeneralFrame,
    commands::{af, app_config, sys, zdo},
    primitives::{BdbCommissioningStatus, Capabilities, LvList, ShortBytes, Status},
};

struct NoopApplication;

impl Application for NoopApplication {
    fn startup<'a>(&'a self, _znp: &'a Znp) -> BoxFuture<'a, Result<(), RequestError>> {
        Box::pin(async { Ok(()) })
    }
}

/// Runs the full startup sequence: reset, await the reset indication, an
/// active-endpoints query, five endpoint registrations, and BDB
/// commissioning, accepting `NoNetwork` as a non-fatal outcome.
struct CommissioningApplication;

impl CommissioningApplication {
    fn endpoint(number: u8) -> af::Register {
        af::Register {
            endpoint: number,
            app_profile_id: 0x0104,
            app_device_id: 0x0005,
            app_device_version: 0,
            latency_req: 0,
            app_in_cluster_list: LvList(vec![0x0000]),
            app_out_cluster_list: LvList(vec![]),
        }
    }
}

impl Application for CommissioningApplication {
    fn startup<'a>(&'a self, znp: &'a Znp) -> BoxFuture<'a, Result<(), RequestError>> {
        Box::pin(async move {
            // Register the reset-indication listener before sending the
            // reset request itself, so a fast-answering device can never
            // deliver the indication before anything is waiting for it.
            let (ind_result, notify_result) = tokio::join!(
                znp.wait_for_response(sys::ResetInd::partial()),
                znp.notify(sys::ResetReq { reset_type: 1 }),
            );
            notify_result?;
            ind_result?;

            znp.request(
                zdo::ActiveEpReq { dst_addr: 0x0000, nwk_addr_of_interest: 0x0000 },
                zdo::ActiveEpReqRsp::partial(),
            )
            .await?;

            for endpoint in 1..=5 {
                znp.request(Self::endpoint(endpoint), af::RegisterRsp::partial()).await?;
            }

            let (_rsp, notification) = znp
                .request_callback_rsp(
                    app_config::BdbStartCommissioning {
                        commissioning_mode: app_config::BdbCommissioningMode(0x04),
                    },
                    app_config::BdbStartCommissioningRsp::partial(),
                    app_config::BdbCommissioningNotification::partial(),
                )
                .await?;

            match notification.status {
                Some(BdbCommissioningStatus::Success | BdbCommissioningStatus::NoNetwork) => Ok(()),
                _ => Err(RequestError::InvalidResponse),
            }
        })
    }
}

fn test_config() -> ZnpConfig {
    let mut config = ZnpConfig::new(DeviceConfig::new("/dev/null"));
    config.znp.sreq_timeout = Duration::from_secs(2);
    config.znp.auto_reconnect = false;
    config
}

/// Answers every `SYS.Ping` SREQ, and every `SYS.NVWrite` SREQ when
/// `answer_nv_write` is set, with a success response. Anything else decoded
/// is forwarded to `on_other` and left unanswered. Frames sent on `inject_rx`
/// are written out unprompted, standing in for an AREQ the real device would
/// emit on its own (e.g. a reset indication).
async fn run_fake_device(
    mut device: DuplexStream,
    answer_nv_write: bool,
    on_other: impl Fn(DecodedCommand) + Send + 'static,
    mut inject_rx: mpsc::UnboundedReceiver<GeneralFrame>,
) {
    let mut codec = FrameCodec::new();
    let mut buf = [0u8; 256];

    loop {
        tokio::select! {
            injected = inject_rx.recv() => {
                let Some(frame) = injected else { continue };
                let mut out = Vec::new();
                frame.encode(&mut out);
                if device.write_all(&out).await.is_err() {
                    return;
                }
            },
            read_result = device.read(&mut buf) => {
                let n = match read_result {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };

                for frame in codec.feed(&buf[..n]) {
                    let Ok(Some(decoded)) = DecodedCommand::from_frame(&frame, true) else { continue };

                    let response = match decoded {
                        DecodedCommand::SysPingReq(_) => Some(sys::PingRsp::new(Capabilities(0)).to_frame()),
                        DecodedCommand::SysNvWriteReq(_) if answer_nv_write => {
                            Some(sys::NvWriteRsp::new(Status::Success).to_frame())
                        },
                        other => {
                            on_other(other);
                            None
                        },
                    };

                    let Some(Ok(response)) = response else { continue };
                    let mut out = Vec::new();
                    response.encode(&mut out);
                    if device.write_all(&out).await.is_err() {
                        return;
                    }
                }
            },
        }
    }
}

/// Spawns [`run_fake_device`] and returns the sender used to inject
/// unsolicited frames.
fn spawn_fake_device(
    device: DuplexStream,
    answer_nv_write: bool,
    on_other: impl Fn(DecodedCommand) + Send + 'static,
) -> mpsc::UnboundedSender<GeneralFrame> {
    let (inject_tx, inject_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_fake_device(device, answer_nv_write, on_other, inject_rx));
    inject_tx
}

/// Answers the fixed startup sequence [`CommissioningApplication`] drives:
/// the liveness ping, a reset request answered with an unsolicited
/// `SYS.ResetInd`, an active-endpoints query, five endpoint registrations,
/// and BDB commissioning answered with a `NoNetwork` notification.
async fn run_startup_sequence_device(mut device: DuplexStream) {
    let mut codec = FrameCodec::new();
    let mut buf = [0u8; 256];

    loop {
        let n = match device.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };

        for frame in codec.feed(&buf[..n]) {
            let Ok(Some(decoded)) = DecodedCommand::from_frame(&frame, true) else { continue };

            let responses: Vec<GeneralFrame> = match decoded {
                DecodedCommand::SysPingReq(_) => {
                    vec![sys::PingRsp::new(Capabilities(0)).to_frame().expect("complete instance")]
                },
                DecodedCommand::SysResetReq(_) => {
                    vec![sys::ResetInd::new(0x02, 0x02, 0x01, 0x02, 0x06, 0x01).to_frame().expect("complete instance")]
                },
                DecodedCommand::ZdoActiveEpReq(_) => {
                    vec![zdo::ActiveEpReqRsp::new(Status::Success).to_frame().expect("complete instance")]
                },
                DecodedCommand::AfRegister(_) => {
                    vec![af::RegisterRsp::new(Status::Success).to_frame().expect("complete instance")]
                },
                DecodedCommand::AppConfigBdbStartCommissioning(_) => vec![
                    app_config::BdbStartCommissioningRsp::new(Status::Success)
                        .to_frame()
                        .expect("complete instance"),
                    app_config::BdbCommissioningNotification::new(
                        BdbCommissioningStatus::NoNetwork,
                        app_config::BdbCommissioningMode(0x04),
                    )
                    .to_frame()
                    .expect("complete instance"),
                ],
                _ => Vec::new(),
            };

            for response in responses {
                let mut out = Vec::new();
                response.encode(&mut out);
                if device.write_all(&out).await.is_err() {
                    return;
                }
            }
        }
    }
}

#[tokio::test]
async fn connect_runs_the_full_commissioning_startup_sequence() {
    let (driver_side, device_side) = tokio::io::duplex(1024);
    tokio::spawn(run_startup_sequence_device(device_side));

    let znp = Znp::connect_with_transport(test_config(), Arc::new(CommissioningApplication), driver_side)
        .await
        .expect("the full startup sequence should complete, tolerating NoNetwork");

    znp.close().await;
}

#[tokio::test]
async fn connect_probes_the_device_and_runs_application_startup() {
    let (driver_side, device_side) = tokio::io::duplex(1024);
    spawn_fake_device(device_side, true, |_| {});

    let znp = Znp::connect_with_transport(test_config(), Arc::new(NoopApplication), driver_side)
        .await
        .expect("connect should succeed once the fake device answers the liveness ping");

    znp.close().await;
}

#[tokio::test]
async fn request_round_trips_a_non_ping_sreq_through_the_fake_device() {
    let (driver_side, device_side) = tokio::io::duplex(1024);
    spawn_fake_device(device_side, true, |_| {});

    let znp = Znp::connect_with_transport(test_config(), Arc::new(NoopApplication), driver_side)
        .await
        .expect("connect should succeed");

    let rsp = znp
        .request(
            sys::NvWriteReq {
                sys_id: 0x01,
                item_id: 0x0002,
                sub_id: 0x0000,
                offset: 0,
                value: ShortBytes(vec![0xAA]),
            },
            sys::NvWriteRsp::partial(),
        )
        .await
        .expect("NVWrite should succeed against the fake device");

    assert_eq!(rsp, sys::NvWriteRsp::new(Status::Success));
    znp.close().await;
}

#[tokio::test]
async fn concurrent_sreqs_are_serialized_through_the_sreq_mutex() {
    let (driver_side, device_side) = tokio::io::duplex(1024);

    let seen_order = Arc::new(Mutex::new(Vec::new()));
    let seen_order_device = Arc::clone(&seen_order);
    spawn_fake_device(device_side, true, move |decoded| {
        if let DecodedCommand::SysNvWriteReq(req) = decoded {
            let seen_order = Arc::clone(&seen_order_device);
            tokio::spawn(async move { seen_order.lock().await.push(req.item_id) });
        }
    });

    let znp = Znp::connect_with_transport(test_config(), Arc::new(NoopApplication), driver_side)
        .await
        .expect("connect should succeed");

    let write = |item_id: u16| {
        let znp = znp.clone();
        async move {
            znp.request(
                sys::NvWriteReq { sys_id: 0x01, item_id, sub_id: 0, offset: 0, value: ShortBytes(vec![0x01]) },
                sys::NvWriteRsp::partial(),
            )
            .await
        }
    };

    let (first, second) = tokio::join!(write(1), write(2));
    assert_eq!(first.expect("first write should succeed"), sys::NvWriteRsp::new(Status::Success));
    assert_eq!(second.expect("second write should succeed"), sys::NvWriteRsp::new(Status::Success));

    // The SREQ mutex forces the second request's frame onto the wire only
    // after the first has resolved, so the device always observes them in
    // the order they were issued, never interleaved.
    assert_eq!(*seen_order.lock().await, vec![1, 2]);
    znp.close().await;
}

#[tokio::test]
async fn request_times_out_when_the_device_never_responds() {
    let (driver_side, device_side) = tokio::io::duplex(1024);
    // The fake device answers the initial connect ping but ignores every
    // `SYS.NVWrite`, so the request below never gets its SRSP.
    spawn_fake_device(device_side, false, |_| {});

    let mut config = test_config();
    config.znp.sreq_timeout = Duration::from_millis(50);
    let znp = Znp::connect_with_transport(config, Arc::new(NoopApplication), driver_side)
        .await
        .expect("connect should succeed");

    let result = znp
        .request(
            sys::NvWriteReq { sys_id: 0x01, item_id: 0x1234, sub_id: 0, offset: 0, value: ShortBytes(vec![0xAA]) },
            sys::NvWriteRsp::partial(),
        )
        .await;

    assert!(matches!(result, Err(RequestError::Timeout(_))));
    znp.close().await;
}

#[tokio::test]
async fn unsolicited_reset_indication_dispatches_to_a_waiting_listener() {
    let (driver_side, device_side) = tokio::io::duplex(1024);
    let inject_tx = spawn_fake_device(device_side, true, |_| {});

    let znp = Znp::connect_with_transport(test_config(), Arc::new(NoopApplication), driver_side)
        .await
        .expect("connect should succeed");

    let ind_frame =
        sys::ResetInd::new(0x02, 0x02, 0x01, 0x02, 0x06, 0x01).to_frame().expect("complete instance encodes");

    let (result, _) = tokio::join!(znp.wait_for_response(sys::ResetInd::partial()), async {
        // give the listener time to register before the indication arrives
        tokio::time::sleep(Duration::from_millis(10)).await;
        inject_tx.send(ind_frame).expect("fake device channel should still be open");
    });

    let ind = result.expect("should observe the reset indication");
    assert_eq!(ind.reason, Some(0x02));
    znp.close().await;
}
