use serde::{Deserialize, Serialize};

use super::vector::RealVector;

fn sigmoid(x: f64) -> f64 {
    let e = x.exp();
    if e.is_infinite() {
        1.
    } else {
        e / (e + 1.)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    #[default]
    Linear,
    ReLu,
    Sigmoid,
    FastSigmoid,
    SiLu,
    Softmax,
}

impl Activation {
    pub fn activate(&self, values: &mut RealVector) {
        match self {
            Activation::Linear => {}
            Activation::ReLu => {
                for x in values.iter_mut() {
                    if *x < 0. {
                        *x = 0.;
                    }
                }
            }
            Activation::Sigmoid => {
                for x in values.iter_mut() {
                    *x = sigmoid(*x);
                }
            }
            Activation::FastSigmoid => {
                for x in values.iter_mut() {
                    *x /= x.abs() + 1.;
                }
            }
            Activation::SiLu => {
                for x in values.iter_mut() {
                    *x *= sigmoid(*x);
                }
            }
            Activation::Softmax => {
                if values.is_empty() {
                    return;
                }
                let max = values.max();
                for x in values.iter_mut() {
                    *x = (*x - max).exp();
                }
                let total = values.reduce();
                values.scale(1. / total);
            }
        }
    }
}
